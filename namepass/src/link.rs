// link.rs — Linked-boundary coordination
//
// Groups name slots that are one logical identifier across a sub-model
// boundary (an outer value and the inner parameter mirroring it, an inner
// result and the owner output it feeds). The resolvers treat each group as a
// single occupant of the namespace and write one resolved string to every
// member.
//
// Preconditions: `graph` was built through the `Graph` API.
// Postconditions: every `Mirrored` binding of a visited owner that can be
//                 honored is a union.
// Failure modes: mirrored friendly names that already disagree → W0102.
// Side effects: appends diagnostics.

use std::collections::HashMap;
use std::hash::Hash;

use tracing::warn;

use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::graph::{Graph, NameLink, NodeId, ValueRef};

// ── Link table ──────────────────────────────────────────────────────────────

/// Disjoint-set over name slots. Keys never seen are singleton classes.
#[derive(Debug, Clone)]
pub struct LinkTable<K> {
    parent: HashMap<K, K>,
    /// Members of each class, keyed by its representative.
    classes: HashMap<K, Vec<K>>,
}

impl<K: Copy + Eq + Hash> Default for LinkTable<K> {
    fn default() -> Self {
        LinkTable {
            parent: HashMap::new(),
            classes: HashMap::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> LinkTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Representative of the class containing `key`.
    pub fn find(&self, mut key: K) -> K {
        while let Some(&up) = self.parent.get(&key) {
            if up == key {
                break;
            }
            key = up;
        }
        key
    }

    /// Merge the classes of `a` and `b`. `a`'s representative survives and
    /// `b`'s members are appended after its own.
    pub fn union(&mut self, a: K, b: K) {
        self.touch(a);
        self.touch(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        self.parent.insert(rb, ra);
        let moved = self.classes.remove(&rb).unwrap_or_default();
        self.classes.entry(ra).or_default().extend(moved);
    }

    /// Every key in the class of `key`, including `key` itself.
    pub fn members(&self, key: K) -> Vec<K> {
        match self.classes.get(&self.find(key)) {
            Some(members) => members.clone(),
            None => vec![key],
        }
    }

    pub fn is_linked(&self, a: K, b: K) -> bool {
        self.find(a) == self.find(b)
    }

    fn touch(&mut self, key: K) {
        if !self.parent.contains_key(&key) {
            self.parent.insert(key, key);
            self.classes.insert(key, vec![key]);
        }
    }
}

// ── Boundary scans ──────────────────────────────────────────────────────────

/// Link outer producer nodes with the inner parameters mirroring them.
/// Only bindings whose two sides carry the same friendly name on entry are
/// linked; the rest are reported and resolved independently. Only the
/// regions of `visited` owners are scanned.
pub fn friendly_links<I>(graph: &Graph, visited: I, diagnostics: &mut Vec<Diagnostic>) -> LinkTable<NodeId>
where
    I: IntoIterator<Item = NodeId>,
{
    let mut links = LinkTable::new();
    for id in visited {
        for region in graph.node(id).regions() {
            for binding in region.inputs.iter().filter(|b| b.link == NameLink::Mirrored) {
                let outer = graph.source_of(binding.outer).node;
                let outer_name = graph.node(outer).friendly_name();
                let inner_name = graph.node(binding.inner).friendly_name();
                if outer_name == inner_name {
                    links.union(outer, binding.inner);
                    continue;
                }
                warn!(
                    outer = %outer,
                    inner = %binding.inner,
                    outer_name,
                    inner_name,
                    "mirrored binding carries diverging friendly names"
                );
                diagnostics.push(
                    Diagnostic::new(
                        DiagLevel::Warning,
                        format!(
                            "mirrored binding links '{}' to '{}'; names differ, resolving separately",
                            outer_name, inner_name
                        ),
                    )
                    .with_code(codes::W0102)
                    .with_related(outer)
                    .with_related(binding.inner),
                );
            }
        }
    }
    links
}

/// Link the name-owning outputs on both sides of every mirrored binding of
/// the `visited` owners.
pub fn tensor_links<I>(graph: &Graph, visited: I) -> LinkTable<ValueRef>
where
    I: IntoIterator<Item = NodeId>,
{
    let mut links = LinkTable::new();
    for id in visited {
        let node = graph.node(id);
        for region in node.regions() {
            for binding in region.inputs.iter().filter(|b| b.link == NameLink::Mirrored) {
                links.union(graph.source_of(binding.outer), binding.inner.out(0));
            }
            for binding in region.outputs.iter().filter(|b| b.link == NameLink::Mirrored) {
                let inner = graph.source_of(binding.inner.out(0));
                links.union(node.id.out(binding.outer), inner);
            }
        }
    }
    links
}

// ── Tests ───────────────────────────────────────────────────────────────────
