// friendly.rs — Friendly-name collision resolution
//
// Default mode: user-set names are reserved first and never rewritten;
// autogenerated names keep their value when free and otherwise get the
// smallest free `_n` suffix (n >= 2). Strict mode: a single pass in visit
// order where every taken name, user-set or not, gets the smallest free
// suffix (n >= 1), so only the first occurrence keeps the bare name.
// Strict mode resolves in one namespace: alternative branches are renumbered
// against each other too.
//
// Nodes linked across a region boundary are resolved together as one name.
//
// Preconditions: `graph` was built through the `Graph` API.
// Postconditions: see `resolve`.
// Failure modes: none.
// Side effects: renames nodes in `graph`.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::diag::{codes, DiagLevel, Diagnostic};
use crate::graph::{Graph, NodeId};
use crate::link::{self, LinkTable};
use crate::pass::{Rename, RenameTarget, ResolveConfig, ResolveReport};
use crate::registry::{NameRegistry, ScopeId};
use crate::traverse::{visit_order, Visit};

/// Suffix numbering for autogenerated names in default mode.
const DEFAULT_FIRST_SUFFIX: u32 = 2;
/// Suffix numbering in strict mode.
const STRICT_FIRST_SUFFIX: u32 = 1;

/// A group of nodes that share one friendly name by construction.
#[derive(Debug)]
struct NameClass {
    scope: ScopeId,
    name: String,
    members: Vec<NodeId>,
    explicit: bool,
}

/// Resolve friendly-name collisions across `graph` and its regions.
///
/// Postconditions: in strict mode every name is unique; in default
/// mode every autogenerated name is unique and user-set names are unchanged.
pub fn resolve(graph: &mut Graph, config: &ResolveConfig) -> ResolveReport {
    let mut report = ResolveReport::default();
    let first_suffix = if config.resolve_all_names {
        STRICT_FIRST_SUFFIX
    } else {
        DEFAULT_FIRST_SUFFIX
    };
    let mut registry = NameRegistry::new(first_suffix);
    let visits = visit_order(graph, config.friendly_scoping(), &mut registry);
    let links = link::friendly_links(graph, visits.iter().map(|v| v.node), &mut report.diagnostics);
    let classes = collect_classes(graph, &visits, &links);

    if config.resolve_all_names {
        for class in &classes {
            settle(graph, &mut registry, class, &mut report);
        }
        return report;
    }

    for class in classes.iter().filter(|c| c.explicit) {
        if registry.reserve(class.scope, &class.name) {
            continue;
        }
        warn!(name = %class.name, node = %class.members[0], "user-set friendly name collides, left untouched");
        let mut diag = Diagnostic::new(
            DiagLevel::Warning,
            format!("friendly name '{}' was set more than once", class.name),
        )
        .with_code(codes::W0101)
        .with_hint("enable resolve_all_names to renumber user-set names");
        for &member in &class.members {
            diag = diag.with_related(member);
        }
        report.diagnostics.push(diag);
    }
    for class in classes.iter().filter(|c| !c.explicit) {
        settle(graph, &mut registry, class, &mut report);
    }
    report
}

/// Group visited nodes by link class, in order of first visit.
fn collect_classes(graph: &Graph, visits: &[Visit], links: &LinkTable<NodeId>) -> Vec<NameClass> {
    let mut seen = HashSet::new();
    let mut classes = Vec::new();
    for visit in visits {
        if !seen.insert(links.find(visit.node)) {
            continue;
        }
        let members = links.members(visit.node);
        let explicit = members.iter().any(|&m| !graph.node(m).is_name_autogenerated());
        classes.push(NameClass {
            scope: visit.scope,
            name: graph.node(visit.node).friendly_name().to_string(),
            members,
            explicit,
        });
    }
    classes
}

/// Reserve the class's name, renaming every member first if it is taken.
fn settle(graph: &mut Graph, registry: &mut NameRegistry, class: &NameClass, report: &mut ResolveReport) {
    let name = registry.next_free(class.scope, &class.name);
    if name != class.name {
        debug!(from = %class.name, to = %name, members = class.members.len(), "renaming friendly name");
        for &member in &class.members {
            graph.rename_node(member, name.clone());
            report.renames.push(Rename {
                target: RenameTarget::FriendlyName(member),
                from: class.name.clone(),
                to: name.clone(),
            });
        }
        if class.explicit {
            report.diagnostics.push(
                Diagnostic::new(
                    DiagLevel::Note,
                    format!("user-set friendly name '{}' renamed to '{}'", class.name, name),
                )
                .with_code(codes::N0103)
                .with_related(class.members[0]),
            );
        }
    }
    registry.reserve(class.scope, &name);
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pass::RegionScoping;

    fn strict() -> ResolveConfig {
        ResolveConfig {
            resolve_all_names: true,
            ..ResolveConfig::default()
        }
    }

    #[test]
    fn explicit_name_wins_over_earlier_autogenerated() {
        let mut g = Graph::new("m");
        let root = g.root();
        let a = g.add_parameter(root).unwrap();
        let b = g.add_parameter(root).unwrap();
        let name = g.node(a).friendly_name().to_string();
        g.set_friendly_name(b, name.clone()).unwrap();
        let concat = g.add_op(root, "Concat", &[a.out(0), b.out(0)], 1).unwrap();
        g.add_result(root, concat.out(0)).unwrap();

        let report = resolve(&mut g, &ResolveConfig::default());
        assert_eq!(g.node(b).friendly_name(), name);
        assert_eq!(g.node(a).friendly_name(), format!("{}_2", name));
        assert_eq!(report.renames.len(), 1);
        assert!(report.diagnostics.is_empty());
        // Pass renames do not turn a name into a user-set one.
        assert!(g.node(a).is_name_autogenerated());
    }

    #[test]
    fn duplicate_explicit_names_are_reported_not_rewritten() {
        let mut g = Graph::new("m");
        let root = g.root();
        let p = g.add_parameter(root).unwrap();
        let c1 = g.add_op(root, "Concat", &[p.out(0)], 1).unwrap();
        let c2 = g.add_op(root, "Concat", &[c1.out(0)], 1).unwrap();
        g.set_friendly_name(c1, "concat").unwrap();
        g.set_friendly_name(c2, "concat").unwrap();
        g.add_result(root, c2.out(0)).unwrap();

        let report = resolve(&mut g, &ResolveConfig::default());
        assert_eq!(g.node(c1).friendly_name(), "concat");
        assert_eq!(g.node(c2).friendly_name(), "concat");
        assert!(!report.changed());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].code, Some(codes::W0101));
        assert_eq!(report.diagnostics[0].related, vec![c2]);
    }

    #[test]
    fn strict_mode_numbers_from_one_in_visit_order() {
        let mut g = Graph::new("m");
        let root = g.root();
        let p = g.add_parameter(root).unwrap();
        let a = g.add_op(root, "Relu", &[p.out(0)], 1).unwrap();
        let b = g.add_op(root, "Relu", &[a.out(0)], 1).unwrap();
        let c = g.add_op(root, "Relu", &[b.out(0)], 1).unwrap();
        for n in [a, b, c] {
            g.set_friendly_name(n, "S").unwrap();
        }
        g.add_result(root, c.out(0)).unwrap();

        let report = resolve(&mut g, &strict());
        assert_eq!(g.node(a).friendly_name(), "S");
        assert_eq!(g.node(b).friendly_name(), "S_1");
        assert_eq!(g.node(c).friendly_name(), "S_2");
        let notes = report
            .diagnostics
            .iter()
            .filter(|d| d.code == Some(codes::N0103))
            .count();
        assert_eq!(notes, 2);
    }

    #[test]
    fn mirrored_parameter_renames_with_its_outer_value() {
        use crate::graph::{InputBinding, SubModel};

        let mut g = Graph::new("m");
        let root = g.root();
        let x = g.add_parameter(root).unwrap();
        let x_name = g.node(x).friendly_name().to_string();
        // A user-set node elsewhere already claims the parameter's name.
        let c = g.add_op(root, "Const", &[], 1).unwrap();
        g.set_friendly_name(c, x_name.clone()).unwrap();

        let then_body = g.add_model("then");
        let xt = g.add_mirrored_parameter(then_body, x.out(0)).unwrap();
        g.add_result(then_body, xt.out(0)).unwrap();
        let else_body = g.add_model("else");
        let xe = g.add_mirrored_parameter(else_body, x.out(0)).unwrap();
        g.add_result(else_body, xe.out(0)).unwrap();
        let regions = vec![
            SubModel::new(then_body).with_input(InputBinding::mirrored(x.out(0), xt)),
            SubModel::new(else_body).with_input(InputBinding::mirrored(x.out(0), xe)),
        ];
        let if_node = g
            .add_multi_region(root, "If", &[c.out(0)], regions, true, 1)
            .unwrap();
        g.add_result(root, if_node.out(0)).unwrap();

        resolve(&mut g, &ResolveConfig::default());
        let renamed = format!("{}_2", x_name);
        assert_eq!(g.node(c).friendly_name(), x_name);
        assert_eq!(g.node(x).friendly_name(), renamed);
        assert_eq!(g.node(xt).friendly_name(), renamed);
        assert_eq!(g.node(xe).friendly_name(), renamed);
    }

    #[test]
    fn alternative_branches_may_share_autogenerated_names() {
        use crate::graph::SubModel;

        let build = || {
            let mut g = Graph::new("m");
            let root = g.root();
            let cond = g.add_parameter(root).unwrap();
            let then_body = g.add_model("then");
            let t = g.add_op(then_body, "Const", &[], 1).unwrap();
            g.add_result(then_body, t.out(0)).unwrap();
            let else_body = g.add_model("else");
            let e = g.add_op(else_body, "Const", &[], 1).unwrap();
            g.add_result(else_body, e.out(0)).unwrap();
            g.rename_node(e, g.node(t).friendly_name().to_string());
            let regions = vec![SubModel::new(then_body), SubModel::new(else_body)];
            let if_node = g
                .add_multi_region(root, "If", &[cond.out(0)], regions, true, 1)
                .unwrap();
            g.add_result(root, if_node.out(0)).unwrap();
            (g, t, e)
        };

        let (mut g, t, e) = build();
        resolve(&mut g, &ResolveConfig::default());
        assert_eq!(g.node(t).friendly_name(), g.node(e).friendly_name());

        let (mut g, t, e) = build();
        let flat = ResolveConfig {
            scoping: RegionScoping::Flattened,
            ..ResolveConfig::default()
        };
        resolve(&mut g, &flat);
        assert_eq!(
            g.node(e).friendly_name(),
            format!("{}_2", g.node(t).friendly_name())
        );
    }
}
