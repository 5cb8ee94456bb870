// id.rs — Stable identifiers for graph entities
//
// Nodes and models live in arenas owned by `Graph`; these IDs are plain
// indices into those arenas. Allocated in construction order, so node IDs
// double as the counter behind autogenerated friendly names.

use std::fmt;

/// Stable identifier for a node. Unique across the whole graph, including
/// nodes that live inside nested sub-models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Stable identifier for a model (the root or a nested sub-model).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }

    /// Reference to output `index` of this node.
    pub fn out(self, index: usize) -> ValueRef {
        ValueRef { node: self, index }
    }
}

impl ModelId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Non-owning reference to one output of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueRef {
    pub node: NodeId,
    pub index: usize,
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.index)
    }
}

/// Allocator for stable IDs. Produces monotonically increasing IDs in
/// allocation order, ensuring deterministic assignment.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next_node: u32,
    next_model: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    pub fn alloc_model(&mut self) -> ModelId {
        let id = ModelId(self.next_model);
        self.next_model += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_monotonic_per_kind() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.alloc_node(), NodeId(0));
        assert_eq!(ids.alloc_model(), ModelId(0));
        assert_eq!(ids.alloc_node(), NodeId(1));
        assert_eq!(ids.alloc_model(), ModelId(1));
    }

    #[test]
    fn value_ref_display() {
        assert_eq!(NodeId(4).out(1).to_string(), "n4.1");
    }
}
