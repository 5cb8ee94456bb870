// namepass — name collision resolution for hierarchical computation graphs
//
// Library root. The pass (`ResolveNameCollisions`) makes node friendly names
// and tensor names unique across a graph and its nested regions, rewriting
// only autogenerated names unless strict mode is selected.

pub mod diag;
pub mod friendly;
pub mod graph;
pub mod id;
pub mod link;
pub mod pass;
pub mod pipeline;
pub mod registry;
pub mod tensor;
pub mod traverse;

pub use graph::{
    Graph, GraphError, InputBinding, ModelId, NameLink, NodeId, NodeKind, OutputBinding, SubModel,
    ValueRef,
};
pub use pass::{GraphPass, RegionScoping, ResolveConfig, ResolveNameCollisions, ResolveReport};
pub use pipeline::PassManager;
