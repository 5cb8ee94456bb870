// tensor.rs — Tensor-name collision resolution
//
// Each output owns a set of aliases; collisions are resolved one alias at a
// time. When an alias is already held by another output, only that alias is
// replaced and the rest of the set is left alone. Port-qualified aliases
// (`base:port`) are renamed on `base`, keeping `:port`.
//
// Priority: outputs of parameter nodes are settled before all others, then
// the remaining outputs in visit order; whoever is settled first keeps the
// alias. Result nodes own no aliases (they re-expose their source) and are
// skipped.
//
// Preconditions: `graph` was built through the `Graph` API.
// Postconditions: every alias is unique within its namespace.
// Failure modes: none.
// Side effects: rewrites tensor name sets in `graph`.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::graph::{Graph, ValueRef};
use crate::link::{self, LinkTable};
use crate::pass::{Rename, RenameTarget, ResolveConfig, ResolveReport};
use crate::registry::{NameRegistry, ScopeId};
use crate::traverse::{visit_order, Visit};

const FIRST_SUFFIX: u32 = 1;

/// Outputs that carry one logical set of aliases.
#[derive(Debug)]
struct OutputClass {
    scope: ScopeId,
    members: Vec<ValueRef>,
}

/// Split `name` into `(base, port)` if it has the form `base:port` with a
/// non-empty base and an all-digit port.
pub fn split_port(name: &str) -> Option<(&str, &str)> {
    let (base, port) = name.rsplit_once(':')?;
    if base.is_empty() || port.is_empty() || !port.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, port))
}

/// Resolve tensor-name collisions across `graph` and its regions.
pub fn resolve(graph: &mut Graph, config: &ResolveConfig) -> ResolveReport {
    let mut report = ResolveReport::default();
    let mut registry = NameRegistry::new(FIRST_SUFFIX);
    let visits = visit_order(graph, config.scoping, &mut registry);
    let links = link::tensor_links(graph, visits.iter().map(|v| v.node));
    let (entries, others) = collect_classes(graph, &visits, &links);
    for class in entries.iter().chain(&others) {
        settle(graph, &mut registry, class, &mut report);
    }
    report
}

/// Group visited outputs by link class, in order of first visit, split into
/// parameter-led classes and the rest.
fn collect_classes(
    graph: &Graph,
    visits: &[Visit],
    links: &LinkTable<ValueRef>,
) -> (Vec<OutputClass>, Vec<OutputClass>) {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    let mut others = Vec::new();
    for visit in visits {
        let node = graph.node(visit.node);
        if node.is_result() {
            continue;
        }
        for output in node.outputs() {
            let value = visit.node.out(output.index);
            if !seen.insert(links.find(value)) {
                continue;
            }
            let class = OutputClass {
                scope: visit.scope,
                members: links.members(value),
            };
            if node.is_parameter() {
                entries.push(class);
            } else {
                others.push(class);
            }
        }
    }
    (entries, others)
}

/// Reserve the class's free aliases, then rename the taken ones.
fn settle(graph: &mut Graph, registry: &mut NameRegistry, class: &OutputClass, report: &mut ResolveReport) {
    let names: BTreeSet<String> = class
        .members
        .iter()
        .flat_map(|&m| graph.output_names(m).iter().cloned())
        .collect();
    let (free, taken): (Vec<String>, Vec<String>) = names
        .into_iter()
        .partition(|name| registry.is_free(class.scope, name));

    // Reserve first so generated names never land on a sibling alias.
    for name in &free {
        registry.reserve(class.scope, name);
    }
    for name in taken {
        let renamed = match split_port(&name) {
            Some((base, port)) => registry.next_free_suffixed(class.scope, base, &format!(":{}", port)),
            None => registry.next_free_suffixed(class.scope, &name, ""),
        };
        debug!(from = %name, to = %renamed, "renaming tensor name");
        for &member in &class.members {
            if graph.replace_output_name(member, &name, &renamed) {
                report.renames.push(Rename {
                    target: RenameTarget::TensorName(member),
                    from: name.clone(),
                    to: renamed.clone(),
                });
            }
        }
        registry.reserve(class.scope, &renamed);
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;

    #[test]
    fn split_port_requires_digits() {
        assert_eq!(split_port("input:1"), Some(("input", "1")));
        assert_eq!(split_port("a:b:12"), Some(("a:b", "12")));
        assert_eq!(split_port("input"), None);
        assert_eq!(split_port("input:"), None);
        assert_eq!(split_port(":3"), None);
        assert_eq!(split_port("scope:name"), None);
    }

    fn two_inputs(first: &[&str], second: &[&str]) -> (Graph, NodeId, NodeId) {
        let mut g = Graph::new("m");
        let root = g.root();
        let a = g.add_parameter(root).unwrap();
        let b = g.add_parameter(root).unwrap();
        g.add_result(root, b.out(0)).unwrap();
        g.add_result(root, a.out(0)).unwrap();
        g.set_output_names(a.out(0), first.iter().copied()).unwrap();
        g.set_output_names(b.out(0), second.iter().copied()).unwrap();
        (g, a, b)
    }

    fn names(g: &Graph, v: ValueRef) -> Vec<&str> {
        g.output_names(v).iter().map(String::as_str).collect()
    }

    #[test]
    fn distinct_names_are_untouched() {
        let (mut g, a, b) = two_inputs(&["input_1", "name"], &["input_2", "test"]);
        let report = resolve(&mut g, &ResolveConfig::default());
        assert!(!report.changed());
        assert_eq!(names(&g, a.out(0)), vec!["input_1", "name"]);
        assert_eq!(names(&g, b.out(0)), vec!["input_2", "test"]);
    }

    #[test]
    fn only_colliding_aliases_are_renamed() {
        let (mut g, a, b) = two_inputs(
            &["input_2", "name", "test", "input:0", "input:1"],
            &["input_2", "test", "input:1", "input:2"],
        );
        let report = resolve(&mut g, &ResolveConfig::default());
        assert_eq!(
            names(&g, a.out(0)),
            vec!["input:0", "input:1", "input_2", "name", "test"]
        );
        assert_eq!(
            names(&g, b.out(0)),
            vec!["input:2", "input_1:1", "input_2_1", "test_1"]
        );
        assert_eq!(report.renames.len(), 3);
    }

    #[test]
    fn parameter_keeps_alias_over_earlier_op() {
        let mut g = Graph::new("m");
        let root = g.root();
        let c = g.add_op(root, "Const", &[], 1).unwrap();
        let p = g.add_parameter(root).unwrap();
        let add = g.add_op(root, "Add", &[c.out(0), p.out(0)], 1).unwrap();
        g.add_result(root, add.out(0)).unwrap();
        g.set_output_names(c.out(0), ["x"]).unwrap();
        g.set_output_names(add.out(0), ["x"]).unwrap();
        g.set_output_names(p.out(0), ["x"]).unwrap();

        resolve(&mut g, &ResolveConfig::default());
        assert_eq!(names(&g, p.out(0)), vec!["x"]);
        assert_eq!(names(&g, c.out(0)), vec!["x_1"]);
        assert_eq!(names(&g, add.out(0)), vec!["x_2"]);
    }

    #[test]
    fn generated_name_skips_sibling_alias() {
        let (mut g, _, b) = two_inputs(&["t"], &["t", "t_1"]);
        resolve(&mut g, &ResolveConfig::default());
        assert_eq!(names(&g, b.out(0)), vec!["t_1", "t_2"]);
    }
}
