//! The graph-to-graph module interface.

use candle_nn::ModuleT;
use trkx_graph::GraphsTuple;

use crate::error::Result;

/// A learned or fixed per-element transform, boxed so blocks can hold any
/// candle module (an [`MlpBlock`](crate::mlp::MlpBlock), a plain `Linear`,
/// or a closure `Fn(&Tensor) -> candle_core::Result<Tensor>`).
pub type BoxedModel = Box<dyn ModuleT>;

/// A transform from graph to graph.
///
/// `train` switches stochastic layers such as dropout on.
pub trait GraphModule {
    fn forward_t(&self, graph: &GraphsTuple, train: bool) -> Result<GraphsTuple>;

    /// Inference-mode forward pass.
    fn forward(&self, graph: &GraphsTuple) -> Result<GraphsTuple> {
        self.forward_t(graph, false)
    }
}
