// pass.rs — The name collision resolution pass
//
// Runs the friendly-name resolver and then the tensor-name resolver over one
// graph root, each with its own registry. Exposes the pass through the
// `GraphPass` trait so it can be scheduled by a `PassManager`.
//
// Preconditions: `graph` was built through the `Graph` API.
// Postconditions: friendly names and tensor names are unique per namespace,
//                 except user-set friendly names in default mode.
// Failure modes: none; findings are reported as diagnostics.
// Side effects: mutates friendly names and tensor name sets in place.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diag::Diagnostic;
use crate::graph::{Graph, NodeId, ValueRef};
use crate::{friendly, tensor};

// ── Configuration ───────────────────────────────────────────────────────────

/// How nested regions share a namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionScoping {
    /// Every region shares one global namespace with the whole graph.
    Flattened,
    /// Alternative regions of one exclusive node (conditional branches) may
    /// reuse each other's names; every region still conflicts with its
    /// enclosing scope and with regions that run together.
    #[default]
    Exclusive,
}

/// Configuration for `ResolveNameCollisions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Strict mode: also renumber colliding user-set friendly names, keeping
    /// only the first occurrence of each name. Overrides `scoping` for
    /// friendly names.
    pub resolve_all_names: bool,
    pub scoping: RegionScoping,
}

impl ResolveConfig {
    /// Scoping used for friendly names. Strict mode always resolves in one
    /// namespace, so conditional branches cannot keep duplicate names.
    pub fn friendly_scoping(&self) -> RegionScoping {
        if self.resolve_all_names {
            RegionScoping::Flattened
        } else {
            self.scoping
        }
    }
}

// ── Report ──────────────────────────────────────────────────────────────────

/// What a rename applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameTarget {
    FriendlyName(NodeId),
    TensorName(ValueRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub target: RenameTarget,
    pub from: String,
    pub to: String,
}

/// Everything one run of the pass changed or noticed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    pub renames: Vec<Rename>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolveReport {
    /// True if any name in the graph was rewritten.
    pub fn changed(&self) -> bool {
        !self.renames.is_empty()
    }

    pub fn merge(&mut self, other: ResolveReport) {
        self.renames.extend(other.renames);
        self.diagnostics.extend(other.diagnostics);
    }
}

// ── Pass trait ──────────────────────────────────────────────────────────────

/// A transformation over a whole graph.
pub trait GraphPass {
    /// Human-readable name for logs.
    fn name(&self) -> &'static str;

    /// Run the pass. Returns true if the graph was modified.
    fn run_on_graph(&mut self, graph: &mut Graph) -> bool;
}

// ── ResolveNameCollisions ───────────────────────────────────────────────────

/// Makes friendly names and tensor names unique across a graph and all of
/// its nested regions.
#[derive(Debug, Clone, Default)]
pub struct ResolveNameCollisions {
    config: ResolveConfig,
}

impl ResolveNameCollisions {
    /// `resolve_all_names` selects strict mode.
    pub fn new(resolve_all_names: bool) -> Self {
        Self::with_config(ResolveConfig {
            resolve_all_names,
            ..ResolveConfig::default()
        })
    }

    pub fn with_config(config: ResolveConfig) -> Self {
        ResolveNameCollisions { config }
    }

    pub fn config(&self) -> &ResolveConfig {
        &self.config
    }

    /// Run both resolvers and return the combined report.
    pub fn run_with_report(&self, graph: &mut Graph) -> ResolveReport {
        let mut report = friendly::resolve(graph, &self.config);
        report.merge(tensor::resolve(graph, &self.config));
        debug!(
            renames = report.renames.len(),
            diagnostics = report.diagnostics.len(),
            strict = self.config.resolve_all_names,
            scoping = ?self.config.scoping,
            "name collisions resolved"
        );
        report
    }
}

impl GraphPass for ResolveNameCollisions {
    fn name(&self) -> &'static str {
        "resolve_name_collisions"
    }

    fn run_on_graph(&mut self, graph: &mut Graph) -> bool {
        self.run_with_report(graph).changed()
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
