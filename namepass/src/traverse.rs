// traverse.rs — Visit order over a graph and its nested regions
//
// Produces the order in which the resolvers see nodes: each model's nodes in
// topological order, with every multi-region node followed immediately by the
// walks of its regions. Opens one registry scope per region as it goes.
//
// Preconditions: `registry` is fresh (only its root scope exists).
// Postconditions: every node reachable from the root's results appears once.
// Failure modes: none.
// Side effects: opens scopes on `registry`.

use tracing::trace;

use crate::graph::{Graph, ModelId, NodeId, NodeKind};
use crate::pass::RegionScoping;
use crate::registry::{NameRegistry, ScopeId};

/// A node together with the registry scope it resolves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    pub node: NodeId,
    pub scope: ScopeId,
}

/// Visit every node of `graph`, root model first, regions interleaved.
pub fn visit_order(graph: &Graph, scoping: RegionScoping, registry: &mut NameRegistry) -> Vec<Visit> {
    let mut visits = Vec::with_capacity(graph.node_count());
    let root = registry.root();
    walk(graph, graph.root(), root, scoping, registry, &mut visits);
    visits
}

fn walk(
    graph: &Graph,
    model: ModelId,
    scope: ScopeId,
    scoping: RegionScoping,
    registry: &mut NameRegistry,
    visits: &mut Vec<Visit>,
) {
    for id in graph.ordered_nodes(model) {
        visits.push(Visit { node: id, scope });
        let node = graph.node(id);
        let regions = node.regions();
        if regions.is_empty() {
            continue;
        }
        let alternatives = matches!(node.kind, NodeKind::MultiRegion { exclusive: true, .. })
            && scoping == RegionScoping::Exclusive
            && regions.len() > 1;
        let scopes = if alternatives {
            registry.open_alternatives(scope, regions.len())
        } else {
            regions.iter().map(|_| registry.open_scope(scope)).collect()
        };
        trace!(node = %id, regions = regions.len(), alternatives, "entering regions");
        for (region, region_scope) in regions.iter().zip(scopes) {
            walk(graph, region.model, region_scope, scoping, registry, visits);
        }
    }
}
