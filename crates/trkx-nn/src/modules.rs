//! Graph networks composed from blocks.
//!
//! - [`GraphIndependent`]: per-field transforms with no message passing
//! - [`InteractionNetwork`]: one edge-then-node message passing round
//!
//! # Interaction network direction
//!
//! The node update aggregates the edges a node *sends*, not the edges it
//! receives:
//!
//! ```text
//! e'_k = φ_e([e_k, v_rk, v_sk])
//! v'_i = φ_v([Σ_{s_k = i} e'_k, v_i])
//! ```
//!
//! The conventional formulation (Battaglia et al., 2016) sums received
//! edges. Switching the direction changes which neighbours a node hears
//! from, so weights trained with one are not valid for the other. Use
//! [`NodeBlock`] directly for the received-edge variant.

use trkx_graph::GraphsTuple;

use candle_nn::VarBuilder;

use crate::blocks::{EdgeBlock, EdgeBlockOptions, NodeBlock, NodeBlockOptions, Reducer};
use crate::config::InfoMaxConfig;
use crate::error::Result;
use crate::mlp::make_mlp_model;
use crate::module::{BoxedModel, GraphModule};

/// Applies optional models to edges, nodes and globals independently.
///
/// A `None` model passes its field through. Connectivity is never touched.
pub struct GraphIndependent {
    edge_model: Option<BoxedModel>,
    node_model: Option<BoxedModel>,
    global_model: Option<BoxedModel>,
}

impl GraphIndependent {
    pub fn new(
        edge_model: Option<BoxedModel>,
        node_model: Option<BoxedModel>,
        global_model: Option<BoxedModel>,
    ) -> Self {
        Self {
            edge_model,
            node_model,
            global_model,
        }
    }

    /// Encoder with a fresh MLP block on edges and on nodes, globals untouched.
    ///
    /// Parameters are stored under `edge_model` and `node_model` below `vb`.
    pub fn mlp(
        edge_input_size: usize,
        node_input_size: usize,
        config: &InfoMaxConfig,
        vb: VarBuilder,
    ) -> Result<Self> {
        let edge_model = make_mlp_model(edge_input_size, config, vb.pp("edge_model"))?;
        let node_model = make_mlp_model(node_input_size, config, vb.pp("node_model"))?;
        Ok(Self::new(
            Some(Box::new(edge_model)),
            Some(Box::new(node_model)),
            None,
        ))
    }
}

impl GraphModule for GraphIndependent {
    fn forward_t(&self, graph: &GraphsTuple, train: bool) -> Result<GraphsTuple> {
        let mut out = graph.clone();
        if let Some(model) = &self.edge_model {
            out = out.with_edges(model.forward_t(graph.require_edges()?, train)?);
        }
        if let Some(model) = &self.node_model {
            out = out.with_nodes(model.forward_t(graph.require_nodes()?, train)?);
        }
        if let Some(model) = &self.global_model {
            out = out.with_globals(model.forward_t(graph.require_globals()?, train)?);
        }
        Ok(out)
    }
}

/// One round of edge update followed by node update. Globals are ignored.
pub struct InteractionNetwork {
    edge_block: EdgeBlock,
    node_block: NodeBlock,
}

impl InteractionNetwork {
    /// Create an interaction network.
    ///
    /// # Arguments
    /// - `edge_model`: Maps `[edges, receiver nodes, sender nodes]` to new edges
    /// - `node_model`: Maps `[reduced sent edges, nodes]` to new nodes
    /// - `reducer`: Edge-to-node reduction, `Reducer::Sum` in the encoder
    pub fn new(edge_model: BoxedModel, node_model: BoxedModel, reducer: Reducer) -> Result<Self> {
        let edge_block = EdgeBlock::new(edge_model, Self::edge_options())?;
        let node_block = NodeBlock::new(node_model, Self::node_options(), reducer)?;
        Ok(Self {
            edge_block,
            node_block,
        })
    }

    /// Inputs of the edge update.
    pub fn edge_options() -> EdgeBlockOptions {
        EdgeBlockOptions::default()
    }

    /// Inputs of the node update.
    pub fn node_options() -> NodeBlockOptions {
        NodeBlockOptions {
            use_received_edges: false,
            use_sent_edges: true,
            use_nodes: true,
            use_globals: false,
        }
    }
}

impl GraphModule for InteractionNetwork {
    /// Requires `nodes` and `edges`; fails before any computation otherwise.
    fn forward_t(&self, graph: &GraphsTuple, train: bool) -> Result<GraphsTuple> {
        graph.require_nodes()?;
        graph.require_edges()?;

        let updated = self.edge_block.forward_t(graph, train)?;
        self.node_block.forward_t(&updated, train)
    }
}
