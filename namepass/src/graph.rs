// graph.rs — Hierarchical graph IR and its construction API
//
// Arena-backed graph: every node and every model (root and nested sub-models)
// lives in one `Graph`. Multi-region nodes own their sub-models; the link
// back from a sub-model to its owner, and from a boundary binding to the outer
// value, is a lookup-only ID, never an owning pointer.
//
// Preconditions: none.
// Postconditions: every graph reachable through this API is structurally
//                 valid (no dangling references, no cross-model edges, no
//                 region owned twice or nested inside itself).
// Failure modes: malformed construction requests → `GraphError`.
// Side effects: none.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use thiserror::Error;

pub use crate::id::{ModelId, NodeId, ValueRef};
use crate::id::IdAllocator;

// ── Public types ────────────────────────────────────────────────────────────

/// One output of a node, with its set of tensor name aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub index: usize,
    names: BTreeSet<String>,
}

impl Output {
    fn new(index: usize) -> Self {
        Output {
            index,
            names: BTreeSet::new(),
        }
    }

    pub fn names(&self) -> &BTreeSet<String> {
        &self.names
    }
}

/// How the names on both sides of a boundary binding relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameLink {
    /// The two sides are distinct identifiers that happen to be bound.
    #[default]
    Independent,
    /// The inner name mirrors the outer one by construction; both sides are
    /// one logical identifier and must be renamed together.
    Mirrored,
}

/// Binds a value of the enclosing model to a parameter of a sub-model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputBinding {
    pub outer: ValueRef,
    pub inner: NodeId,
    pub link: NameLink,
}

impl InputBinding {
    pub fn new(outer: ValueRef, inner: NodeId) -> Self {
        InputBinding {
            outer,
            inner,
            link: NameLink::Independent,
        }
    }

    pub fn mirrored(outer: ValueRef, inner: NodeId) -> Self {
        InputBinding {
            outer,
            inner,
            link: NameLink::Mirrored,
        }
    }
}

/// Binds a result of a sub-model to an output of the owning node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputBinding {
    pub inner: NodeId,
    pub outer: usize,
    pub link: NameLink,
}

impl OutputBinding {
    pub fn new(inner: NodeId, outer: usize) -> Self {
        OutputBinding {
            inner,
            outer,
            link: NameLink::Independent,
        }
    }

    pub fn mirrored(inner: NodeId, outer: usize) -> Self {
        OutputBinding {
            inner,
            outer,
            link: NameLink::Mirrored,
        }
    }
}

/// A nested region owned by a multi-region node, with its boundary mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubModel {
    pub model: ModelId,
    pub inputs: Vec<InputBinding>,
    pub outputs: Vec<OutputBinding>,
}

impl SubModel {
    pub fn new(model: ModelId) -> Self {
        SubModel {
            model,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn with_input(mut self, binding: InputBinding) -> Self {
        self.inputs.push(binding);
        self
    }

    pub fn with_output(mut self, binding: OutputBinding) -> Self {
        self.outputs.push(binding);
        self
    }
}

/// The kind of a graph node. Only the multi-region capability matters to
/// the name resolvers; everything else is an opaque `Op`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Entry node of a model.
    Parameter,
    /// Exit node of a model. Re-exposes its single input.
    Result,
    /// Any single-region operation.
    Op,
    /// A node owning nested regions (conditional branches, loop bodies).
    /// `exclusive` regions are alternatives: at most one executes.
    MultiRegion {
        regions: Vec<SubModel>,
        exclusive: bool,
    },
}

/// A node in the graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub model: ModelId,
    pub op_type: String,
    pub kind: NodeKind,
    pub inputs: Vec<ValueRef>,
    outputs: Vec<Output>,
    friendly_name: String,
    autogenerated: bool,
}

impl Node {
    pub fn friendly_name(&self) -> &str {
        &self.friendly_name
    }

    /// True until someone calls `Graph::set_friendly_name` on this node.
    pub fn is_name_autogenerated(&self) -> bool {
        self.autogenerated
    }

    pub fn outputs(&self) -> &[Output] {
        &self.outputs
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, NodeKind::Parameter)
    }

    pub fn is_result(&self) -> bool {
        matches!(self.kind, NodeKind::Result)
    }

    /// Nested regions of a multi-region node; empty for every other kind.
    pub fn regions(&self) -> &[SubModel] {
        match &self.kind {
            NodeKind::MultiRegion { regions, .. } => regions,
            _ => &[],
        }
    }
}

/// A model: the root graph or a nested sub-model.
#[derive(Debug, Clone)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
    /// The multi-region node owning this model; `None` for the root and for
    /// models not yet attached.
    pub owner: Option<NodeId>,
    pub parameters: Vec<NodeId>,
    pub results: Vec<NodeId>,
    /// All nodes created in this model, in creation order.
    pub nodes: Vec<NodeId>,
}

/// Errors reported while building a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown model {0}")]
    UnknownModel(ModelId),
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("value {value} out of range: node has {outputs} outputs")]
    OutputOutOfRange { value: ValueRef, outputs: usize },
    #[error("value {value} belongs to model {found}, expected a value of model {expected}")]
    CrossModelReference {
        value: ValueRef,
        expected: ModelId,
        found: ModelId,
    },
    #[error("model {model} is already owned by node {owner}")]
    ModelAlreadyOwned { model: ModelId, owner: NodeId },
    #[error("model {model} cannot be a region of a node inside itself")]
    RecursiveRegion { model: ModelId },
    #[error("node {node} is not a parameter of model {model}")]
    NotAParameter { node: NodeId, model: ModelId },
    #[error("node {node} is not a result of model {model}")]
    NotAResult { node: NodeId, model: ModelId },
    #[error("output binding targets output {index}, but node has {outputs} outputs")]
    BindingOutOfRange { index: usize, outputs: usize },
}

/// The complete hierarchical graph.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    models: Vec<Model>,
    ids: IdAllocator,
    root: ModelId,
}

// ── Construction ────────────────────────────────────────────────────────────

impl Graph {
    /// Create a graph with an empty root model.
    pub fn new(name: impl Into<String>) -> Self {
        let mut graph = Graph {
            nodes: Vec::new(),
            models: Vec::new(),
            ids: IdAllocator::new(),
            root: ModelId(0),
        };
        graph.root = graph.add_model(name);
        graph
    }

    pub fn root(&self) -> ModelId {
        self.root
    }

    /// Create a detached model, to be attached later as a region of a
    /// multi-region node.
    pub fn add_model(&mut self, name: impl Into<String>) -> ModelId {
        let id = self.ids.alloc_model();
        self.models.push(Model {
            id,
            name: name.into(),
            owner: None,
            parameters: Vec::new(),
            results: Vec::new(),
            nodes: Vec::new(),
        });
        id
    }

    /// Add an entry node to `model`.
    pub fn add_parameter(&mut self, model: ModelId) -> Result<NodeId, GraphError> {
        let id = self.push_node(model, "Parameter", NodeKind::Parameter, Vec::new(), 1)?;
        self.models[model.index()].parameters.push(id);
        Ok(id)
    }

    /// Add an entry node to `model` that mirrors `outer`, a value of the
    /// enclosing model: it copies the outer producer's friendly name (and its
    /// autogenerated flag) and the outer tensor names. Bind it with
    /// `InputBinding::mirrored` to keep both sides in step.
    pub fn add_mirrored_parameter(&mut self, model: ModelId, outer: ValueRef) -> Result<NodeId, GraphError> {
        let source = self.node_ref(outer.node)?;
        if outer.index >= source.outputs.len() {
            return Err(GraphError::OutputOutOfRange {
                value: outer,
                outputs: source.outputs.len(),
            });
        }
        let name = source.friendly_name.clone();
        let autogenerated = source.autogenerated;
        let names = self.output_names(outer).clone();

        let id = self.add_parameter(model)?;
        let node = &mut self.nodes[id.index()];
        node.friendly_name = name;
        node.autogenerated = autogenerated;
        node.outputs[0].names = names;
        Ok(id)
    }

    /// Add an opaque operation with `num_outputs` outputs.
    pub fn add_op(
        &mut self,
        model: ModelId,
        op_type: &str,
        inputs: &[ValueRef],
        num_outputs: usize,
    ) -> Result<NodeId, GraphError> {
        for value in inputs {
            self.check_value_in(model, *value)?;
        }
        self.push_node(model, op_type, NodeKind::Op, inputs.to_vec(), num_outputs)
    }

    /// Add an exit node re-exposing `source`.
    pub fn add_result(&mut self, model: ModelId, source: ValueRef) -> Result<NodeId, GraphError> {
        self.check_value_in(model, source)?;
        let id = self.push_node(model, "Result", NodeKind::Result, vec![source], 1)?;
        self.models[model.index()].results.push(id);
        Ok(id)
    }

    /// Add a node owning `regions`. Outer values of the input bindings are
    /// appended to the node's inputs unless already present.
    pub fn add_multi_region(
        &mut self,
        model: ModelId,
        op_type: &str,
        inputs: &[ValueRef],
        regions: Vec<SubModel>,
        exclusive: bool,
        num_outputs: usize,
    ) -> Result<NodeId, GraphError> {
        for value in inputs {
            self.check_value_in(model, *value)?;
        }
        let enclosing = self.enclosing_models(model)?;
        let mut seen = HashSet::new();
        for region in &regions {
            let sub = self.model_ref(region.model)?;
            if region.model == self.root || enclosing.contains(&region.model) || !seen.insert(region.model) {
                return Err(GraphError::RecursiveRegion {
                    model: region.model,
                });
            }
            if let Some(owner) = sub.owner {
                return Err(GraphError::ModelAlreadyOwned {
                    model: region.model,
                    owner,
                });
            }
            for binding in &region.inputs {
                self.check_value_in(model, binding.outer)?;
                if !sub.parameters.contains(&binding.inner) {
                    return Err(GraphError::NotAParameter {
                        node: binding.inner,
                        model: region.model,
                    });
                }
            }
            for binding in &region.outputs {
                if !sub.results.contains(&binding.inner) {
                    return Err(GraphError::NotAResult {
                        node: binding.inner,
                        model: region.model,
                    });
                }
                if binding.outer >= num_outputs {
                    return Err(GraphError::BindingOutOfRange {
                        index: binding.outer,
                        outputs: num_outputs,
                    });
                }
            }
        }

        let mut all_inputs = inputs.to_vec();
        for binding in regions.iter().flat_map(|r| r.inputs.iter()) {
            if !all_inputs.contains(&binding.outer) {
                all_inputs.push(binding.outer);
            }
        }
        let region_models: Vec<ModelId> = regions.iter().map(|r| r.model).collect();
        let id = self.push_node(
            model,
            op_type,
            NodeKind::MultiRegion { regions, exclusive },
            all_inputs,
            num_outputs,
        )?;
        for sub in region_models {
            self.models[sub.index()].owner = Some(id);
        }
        Ok(id)
    }

    fn push_node(
        &mut self,
        model: ModelId,
        op_type: &str,
        kind: NodeKind,
        inputs: Vec<ValueRef>,
        num_outputs: usize,
    ) -> Result<NodeId, GraphError> {
        self.model_ref(model)?;
        let id = self.ids.alloc_node();
        self.nodes.push(Node {
            id,
            model,
            op_type: op_type.to_string(),
            kind,
            inputs,
            outputs: (0..num_outputs).map(Output::new).collect(),
            friendly_name: format!("{}_{}", op_type, id.0),
            autogenerated: true,
        });
        self.models[model.index()].nodes.push(id);
        Ok(id)
    }

    fn check_value_in(&self, model: ModelId, value: ValueRef) -> Result<(), GraphError> {
        let node = self.node_ref(value.node)?;
        if value.index >= node.outputs.len() {
            return Err(GraphError::OutputOutOfRange {
                value,
                outputs: node.outputs.len(),
            });
        }
        if node.model != model {
            return Err(GraphError::CrossModelReference {
                value,
                expected: model,
                found: node.model,
            });
        }
        Ok(())
    }

    /// `model` and every model enclosing it, innermost first.
    fn enclosing_models(&self, model: ModelId) -> Result<Vec<ModelId>, GraphError> {
        let mut chain = vec![model];
        let mut current = self.model_ref(model)?;
        while let Some(owner) = current.owner {
            let parent = self.nodes[owner.index()].model;
            chain.push(parent);
            current = &self.models[parent.index()];
        }
        Ok(chain)
    }

    fn model_ref(&self, id: ModelId) -> Result<&Model, GraphError> {
        self.models.get(id.index()).ok_or(GraphError::UnknownModel(id))
    }

    fn node_ref(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id.index()).ok_or(GraphError::UnknownNode(id))
    }
}

// ── Access and mutation ─────────────────────────────────────────────────────

impl Graph {
    /// Panics if `id` was not allocated by this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Panics if `id` was not allocated by this graph.
    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.index()]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Set a user-chosen friendly name. The node is no longer considered
    /// autogenerated and will not be rewritten by the default resolver.
    pub fn set_friendly_name(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(id.index()).ok_or(GraphError::UnknownNode(id))?;
        node.friendly_name = name.into();
        node.autogenerated = false;
        Ok(())
    }

    /// Rename without touching the autogenerated flag.
    pub(crate) fn rename_node(&mut self, id: NodeId, name: String) {
        self.nodes[id.index()].friendly_name = name;
    }

    /// Follow result nodes back to the output that actually owns the names.
    pub fn source_of(&self, mut value: ValueRef) -> ValueRef {
        loop {
            let node = &self.nodes[value.node.index()];
            match (&node.kind, node.inputs.first()) {
                (NodeKind::Result, Some(input)) => value = *input,
                _ => return value,
            }
        }
    }

    /// Tensor names of `value`. Names of a result's output are the names of
    /// its source. Panics if `value` does not name an output of this graph.
    pub fn output_names(&self, value: ValueRef) -> &BTreeSet<String> {
        let owner = self.source_of(value);
        &self.nodes[owner.node.index()].outputs[owner.index].names
    }

    /// Replace the tensor names of `value` (or of its source, for results).
    pub fn set_output_names<I, S>(&mut self, value: ValueRef, names: I) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let output = self.owned_output_mut(value)?;
        output.names = names.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Add tensor names to `value` (or to its source, for results).
    pub fn add_output_names<I, S>(&mut self, value: ValueRef, names: I) -> Result<(), GraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let output = self.owned_output_mut(value)?;
        output.names.extend(names.into_iter().map(Into::into));
        Ok(())
    }

    /// Swap one alias for another on an owned output. Returns false if `from`
    /// was not present.
    pub(crate) fn replace_output_name(&mut self, owner: ValueRef, from: &str, to: &str) -> bool {
        let names = &mut self.nodes[owner.node.index()].outputs[owner.index].names;
        if names.remove(from) {
            names.insert(to.to_string());
            true
        } else {
            false
        }
    }

    fn owned_output_mut(&mut self, value: ValueRef) -> Result<&mut Output, GraphError> {
        let node = self.node_ref(value.node)?;
        if value.index >= node.outputs.len() {
            return Err(GraphError::OutputOutOfRange {
                value,
                outputs: node.outputs.len(),
            });
        }
        let owner = self.source_of(value);
        Ok(&mut self.nodes[owner.node.index()].outputs[owner.index])
    }
}

// ── Ordering ────────────────────────────────────────────────────────────────

impl Graph {
    /// Deterministic topological order of the nodes of `model`: parameters
    /// in declared order, then a depth-first post-order from the results.
    /// Nodes not reachable from a result are not part of the model's order.
    pub fn ordered_nodes(&self, model: ModelId) -> Vec<NodeId> {
        let model = &self.models[model.index()];
        let mut order = Vec::with_capacity(model.nodes.len());
        let mut visited = HashSet::new();
        for &param in &model.parameters {
            if visited.insert(param) {
                order.push(param);
            }
        }

        // (node, next input to expand)
        let mut stack: Vec<(NodeId, usize)> = Vec::new();
        for &result in &model.results {
            if !visited.insert(result) {
                continue;
            }
            stack.push((result, 0));
            while let Some((id, next)) = stack.pop() {
                let inputs = &self.nodes[id.index()].inputs;
                if let Some(input) = inputs.get(next) {
                    stack.push((id, next + 1));
                    if visited.insert(input.node) {
                        stack.push((input.node, 0));
                    }
                } else {
                    order.push(id);
                }
            }
        }
        order
    }
}

// ── Display ─────────────────────────────────────────────────────────────────

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_model(f, self.root, 0)
    }
}

impl Graph {
    fn fmt_model(&self, f: &mut fmt::Formatter<'_>, model: ModelId, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        writeln!(f, "{}model '{}'", indent, self.models[model.index()].name)?;
        for id in self.ordered_nodes(model) {
            let node = &self.nodes[id.index()];
            let marker = if node.autogenerated { "" } else { " (user)" };
            write!(f, "{}  {} {} '{}'{}", indent, id, node.op_type, node.friendly_name, marker)?;
            if !node.is_result() {
                for output in &node.outputs {
                    if output.names.is_empty() {
                        continue;
                    }
                    let names: Vec<&str> = output.names.iter().map(String::as_str).collect();
                    write!(f, " [{}: {}]", output.index, names.join(", "))?;
                }
            }
            writeln!(f)?;
            for region in node.regions() {
                self.fmt_model(f, region.model, depth + 2)?;
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
