// pipeline.rs — Pass orchestration
//
// Runs registered graph passes in registration order against one graph and
// reports whether any of them changed it, so callers can decide whether to
// re-run dependent validation.
//
// Preconditions: none.
// Postconditions: every registered pass has run exactly once per call.
// Failure modes: none (passes are total).
// Side effects: passes mutate the graph; on_pass_complete is called after each pass.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::graph::Graph;
use crate::pass::GraphPass;

/// An ordered list of passes.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<Box<dyn GraphPass>>,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pass; it runs after every pass registered before it.
    pub fn register_pass<P: GraphPass + 'static>(&mut self, pass: P) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Run every pass. Returns true if any pass modified the graph.
    pub fn run_passes(&mut self, graph: &mut Graph) -> bool {
        self.run_passes_with(graph, |_, _, _| {})
    }

    /// Like `run_passes`, calling `on_pass_complete(name, changed, elapsed)`
    /// after each pass.
    pub fn run_passes_with(
        &mut self,
        graph: &mut Graph,
        mut on_pass_complete: impl FnMut(&str, bool, Duration),
    ) -> bool {
        let mut any_changed = false;
        for pass in &mut self.passes {
            let start = Instant::now();
            let changed = pass.run_on_graph(graph);
            let elapsed = start.elapsed();
            debug!(
                pass = pass.name(),
                changed,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                "pass complete"
            );
            on_pass_complete(pass.name(), changed, elapsed);
            any_changed |= changed;
        }
        any_changed
    }
}
