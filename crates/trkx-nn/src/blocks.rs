//! Edge and node update blocks.
//!
//! Each block gathers a configurable set of inputs for every element,
//! concatenates them along the feature axis and applies one model:
//!
//! ```text
//! EdgeBlock: e'_k = φ_e([e_k, v_rk, v_sk, u])
//! NodeBlock: v'_i = φ_v([Σ_{r_k = i} e'_k, Σ_{s_k = i} e'_k, v_i, u])
//! ```
//!
//! Bracketed parts are included only when their flag is set, always in the
//! order shown. Input fields are checked before the model runs, so a block
//! configured for node features fails on a node-less graph without doing
//! any work.

use candle_core::{Tensor, D};
use trkx_graph::{
    broadcast_globals_to_edges, broadcast_globals_to_nodes, broadcast_receiver_nodes_to_edges,
    broadcast_sender_nodes_to_edges, segment_mean, segment_sum, GraphsTuple,
};

use crate::error::{Error, Result};
use crate::module::{BoxedModel, GraphModule};

/// How edge features are reduced onto nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducer {
    /// m_i = Σ e_k. Empty neighbourhoods give zero.
    #[default]
    Sum,
    /// m_i = (1/|k|) Σ e_k. Empty neighbourhoods give zero.
    Mean,
}

impl Reducer {
    fn reduce(self, data: &Tensor, segment_ids: &Tensor, num_segments: usize) -> Result<Tensor> {
        let out = match self {
            Reducer::Sum => segment_sum(data, segment_ids, num_segments)?,
            Reducer::Mean => segment_mean(data, segment_ids, num_segments)?,
        };
        Ok(out)
    }
}

/// Which inputs an [`EdgeBlock`] feeds to its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeBlockOptions {
    pub use_edges: bool,
    pub use_receiver_nodes: bool,
    pub use_sender_nodes: bool,
    pub use_globals: bool,
}

impl Default for EdgeBlockOptions {
    /// Edges and both endpoints; globals are unused by this model family.
    fn default() -> Self {
        Self {
            use_edges: true,
            use_receiver_nodes: true,
            use_sender_nodes: true,
            use_globals: false,
        }
    }
}

impl EdgeBlockOptions {
    /// Endpoint node features only, no prior edge features.
    pub fn nodes_only() -> Self {
        Self {
            use_edges: false,
            ..Self::default()
        }
    }

    /// Width of the concatenated model input.
    pub fn input_size(&self, edge_size: usize, node_size: usize, global_size: usize) -> usize {
        let mut size = 0;
        if self.use_edges {
            size += edge_size;
        }
        if self.use_receiver_nodes {
            size += node_size;
        }
        if self.use_sender_nodes {
            size += node_size;
        }
        if self.use_globals {
            size += global_size;
        }
        size
    }

    fn any(&self) -> bool {
        self.use_edges || self.use_receiver_nodes || self.use_sender_nodes || self.use_globals
    }
}

/// Per-edge update from edge, endpoint and global features.
pub struct EdgeBlock {
    model: BoxedModel,
    options: EdgeBlockOptions,
}

impl EdgeBlock {
    /// Create an edge block. At least one input must be enabled.
    pub fn new(model: BoxedModel, options: EdgeBlockOptions) -> Result<Self> {
        if !options.any() {
            return Err(Error::InvalidConfig(
                "edge block needs at least one input".into(),
            ));
        }
        Ok(Self { model, options })
    }

    pub fn options(&self) -> EdgeBlockOptions {
        self.options
    }

    fn collect_inputs(&self, graph: &GraphsTuple) -> Result<Tensor> {
        let mut parts = Vec::with_capacity(4);
        if self.options.use_edges {
            parts.push(graph.require_edges()?.clone());
        }
        if self.options.use_receiver_nodes {
            parts.push(broadcast_receiver_nodes_to_edges(graph)?);
        }
        if self.options.use_sender_nodes {
            parts.push(broadcast_sender_nodes_to_edges(graph)?);
        }
        if self.options.use_globals {
            parts.push(broadcast_globals_to_edges(graph)?);
        }
        Ok(Tensor::cat(&parts, D::Minus1)?)
    }
}

impl GraphModule for EdgeBlock {
    fn forward_t(&self, graph: &GraphsTuple, train: bool) -> Result<GraphsTuple> {
        let inputs = self.collect_inputs(graph)?;
        let edges = self.model.forward_t(&inputs, train)?;
        Ok(graph.with_edges(edges))
    }
}

/// Which inputs a [`NodeBlock`] feeds to its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeBlockOptions {
    pub use_received_edges: bool,
    pub use_sent_edges: bool,
    pub use_nodes: bool,
    pub use_globals: bool,
}

impl Default for NodeBlockOptions {
    /// Received-edge aggregate plus the node's own features.
    fn default() -> Self {
        Self {
            use_received_edges: true,
            use_sent_edges: false,
            use_nodes: true,
            use_globals: false,
        }
    }
}

impl NodeBlockOptions {
    /// Current node features only: a per-node transform.
    pub fn nodes_only() -> Self {
        Self {
            use_received_edges: false,
            ..Self::default()
        }
    }

    /// Width of the concatenated model input.
    pub fn input_size(&self, edge_size: usize, node_size: usize, global_size: usize) -> usize {
        let mut size = 0;
        if self.use_received_edges {
            size += edge_size;
        }
        if self.use_sent_edges {
            size += edge_size;
        }
        if self.use_nodes {
            size += node_size;
        }
        if self.use_globals {
            size += global_size;
        }
        size
    }

    fn any(&self) -> bool {
        self.use_received_edges || self.use_sent_edges || self.use_nodes || self.use_globals
    }
}

/// Per-node update from aggregated incident edges, node and global features.
pub struct NodeBlock {
    model: BoxedModel,
    options: NodeBlockOptions,
    reducer: Reducer,
}

impl NodeBlock {
    /// Create a node block. At least one input must be enabled.
    ///
    /// `reducer` is used for both received and sent edges.
    pub fn new(model: BoxedModel, options: NodeBlockOptions, reducer: Reducer) -> Result<Self> {
        if !options.any() {
            return Err(Error::InvalidConfig(
                "node block needs at least one input".into(),
            ));
        }
        Ok(Self {
            model,
            options,
            reducer,
        })
    }

    pub fn options(&self) -> NodeBlockOptions {
        self.options
    }

    fn collect_inputs(&self, graph: &GraphsTuple) -> Result<Tensor> {
        let n = graph.num_nodes();
        let mut parts = Vec::with_capacity(4);
        if self.options.use_received_edges {
            let edges = graph.require_edges()?;
            parts.push(self.reducer.reduce(edges, graph.receivers(), n)?);
        }
        if self.options.use_sent_edges {
            let edges = graph.require_edges()?;
            parts.push(self.reducer.reduce(edges, graph.senders(), n)?);
        }
        if self.options.use_nodes {
            parts.push(graph.require_nodes()?.clone());
        }
        if self.options.use_globals {
            parts.push(broadcast_globals_to_nodes(graph)?);
        }
        Ok(Tensor::cat(&parts, D::Minus1)?)
    }
}

impl GraphModule for NodeBlock {
    fn forward_t(&self, graph: &GraphsTuple, train: bool) -> Result<GraphsTuple> {
        let inputs = self.collect_inputs(graph)?;
        let nodes = self.model.forward_t(&inputs, train)?;
        Ok(graph.with_nodes(nodes))
    }
}
