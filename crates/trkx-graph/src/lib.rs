//! Graph records for track-graph neural networks.
//!
//! `trkx-graph` is the structure layer underneath `trkx-nn`. It owns the
//! [`GraphsTuple`] record (nodes, edges, senders, receivers, globals) and the
//! handful of tensor operations message passing needs on top of it.
//!
//! ## Batches
//!
//! Several graphs are processed as one combined graph with disjoint node
//! index ranges. `n_node` / `n_edge` remember where each graph starts:
//!
//! ```text
//! graph 0: nodes 0..3, edges 0..2
//! graph 1: nodes 3..5, edges 2..3   (senders/receivers offset by 3)
//! ```
//!
//! ## Modules
//!
//! - [`graph`]: the record type, validation, batching, feature concatenation
//! - [`ops`]: gather (node → edge) and scatter (edge → node) reductions
//!
//! ## Example
//!
//! ```rust,ignore
//! use candle_core::{Device, Tensor};
//! use trkx_graph::GraphsTuple;
//!
//! let device = Device::Cpu;
//! let nodes = Tensor::randn(0f32, 1f32, (3, 4), &device)?;
//! let graph = GraphsTuple::from_edge_list(nodes, None, &[(0, 1), (1, 2)])?;
//! assert_eq!(graph.num_edges(), 2);
//! ```

pub mod error;
pub mod graph;
pub mod ops;

pub use error::{Error, Result};
pub use graph::{concat_features, GraphsTuple};
pub use ops::{
    broadcast_globals_to_edges, broadcast_globals_to_nodes, broadcast_receiver_nodes_to_edges,
    broadcast_sender_nodes_to_edges, received_edges_to_nodes_aggregator, segment_mean,
    segment_sum, sent_edges_to_nodes_aggregator,
};
