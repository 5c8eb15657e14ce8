//! Deep Graph InfoMax components.
//!
//! DGI (Veličković et al., 2019) learns node representations without labels
//! by contrasting a graph with a corrupted copy of itself:
//!
//! ```text
//! H  = E(G)             latent nodes of the real graph
//! H~ = E(C(G))          latent nodes of the corrupted graph
//! s  = R(H)             graph summary
//! D(h_i, s)  -> 1       real pairs
//! D(h~_i, s) -> 0       corrupted pairs
//! ```
//!
//! - [`CorruptionFunction`] (C): shuffles edge receivers
//! - [`ReadoutFunction`] (R): per-graph sum of node features
//! - [`DeepGraphInfoMax`] (E): encoder plus repeated interaction rounds
//! - [`Discriminator`] (D): per-node probability that a pair is genuine

use candle_core::{Result as CandleResult, Tensor, D};
use candle_nn::{ModuleT, VarBuilder};
use rand::seq::SliceRandom;
use rand::Rng;
use trkx_graph::{concat_features, segment_sum, GraphsTuple};

use crate::blocks::{EdgeBlock, EdgeBlockOptions, NodeBlock, NodeBlockOptions, Reducer};
use crate::config::InfoMaxConfig;
use crate::error::{Error, Result};
use crate::mlp::{make_mlp_model, Mlp};
use crate::module::{BoxedModel, GraphModule};
use crate::modules::{GraphIndependent, InteractionNetwork};

/// Builds negative examples by permuting edge receivers.
///
/// The permutation keeps the multiset of receivers, so every node keeps its
/// in-degree while edges lose their true endpoints. Over a batch the
/// shuffle spans all graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorruptionFunction;

impl CorruptionFunction {
    pub fn new() -> Self {
        Self
    }

    /// Corrupt with the thread-local random source.
    pub fn corrupt(&self, graph: &GraphsTuple) -> Result<GraphsTuple> {
        self.corrupt_with_rng(graph, &mut rand::rng())
    }

    /// Corrupt with a caller-supplied random source.
    pub fn corrupt_with_rng<R: Rng + ?Sized>(
        &self,
        graph: &GraphsTuple,
        rng: &mut R,
    ) -> Result<GraphsTuple> {
        let mut receivers = graph.receivers().to_vec1::<u32>()?;
        receivers.shuffle(rng);
        tracing::trace!(edges = receivers.len(), "shuffled receivers");

        let receivers = Tensor::from_vec(receivers, graph.num_edges(), graph.device())?;
        Ok(graph.with_receivers(receivers)?)
    }
}

impl GraphModule for CorruptionFunction {
    fn forward_t(&self, graph: &GraphsTuple, _train: bool) -> Result<GraphsTuple> {
        self.corrupt(graph)
    }
}

/// Replaces node features with their per-graph sum.
///
/// A single graph with N nodes of width F yields nodes of shape `[1, F]`;
/// a batch of G graphs yields `[G, F]`. Other fields are unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadoutFunction;

impl ReadoutFunction {
    pub fn new() -> Self {
        Self
    }
}

impl GraphModule for ReadoutFunction {
    fn forward_t(&self, graph: &GraphsTuple, _train: bool) -> Result<GraphsTuple> {
        let nodes = graph.require_nodes()?;
        let summary = segment_sum(nodes, &graph.node_graph_index()?, graph.num_graphs())?;
        Ok(graph.with_nodes(summary))
    }
}

/// The InfoMax encoder.
///
/// ```text
/// latent0 = edge_encoder(node_encoder(G))
/// latent  = latent0
/// repeat K: latent = core(concat(latent0, latent))
/// ```
///
/// Every round re-reads `latent0`, so the original encoding is never lost
/// across rounds. The core is one [`InteractionNetwork`] shared by all
/// rounds.
pub struct DeepGraphInfoMax {
    node_encoder: NodeBlock,
    edge_encoder: EdgeBlock,
    core: InteractionNetwork,
    num_processing_steps: usize,
}

impl DeepGraphInfoMax {
    /// Create the encoder.
    ///
    /// Parameters are stored under `node_encoder_block`, `edge_encoder_block`
    /// and `interaction_network` below `vb`.
    pub fn new(config: &InfoMaxConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let latent = config.latent_size;

        let node_model = make_mlp_model(
            config.node_input_size,
            config,
            vb.pp("node_encoder_block"),
        )?;
        let node_encoder = NodeBlock::new(
            Box::new(node_model),
            NodeBlockOptions::nodes_only(),
            Reducer::Sum,
        )?;

        let edge_options = EdgeBlockOptions::nodes_only();
        let dropout = (config.edge_dropout > 0.0).then_some(config.edge_dropout);
        let edge_model = Mlp::new(
            edge_options.input_size(0, latent, 0),
            &vec![latent; config.num_layers],
            true,
            dropout,
            vb.pp("edge_encoder_block"),
        )?;
        let edge_encoder = EdgeBlock::new(Box::new(edge_model), edge_options)?;

        // The core sees concat(latent0, latent) on both nodes and edges.
        let core_vb = vb.pp("interaction_network");
        let edge_in = InteractionNetwork::edge_options().input_size(2 * latent, 2 * latent, 0);
        let node_in = InteractionNetwork::node_options().input_size(latent, 2 * latent, 0);
        let core = InteractionNetwork::new(
            Box::new(make_mlp_model(edge_in, config, core_vb.pp("edge_model"))?),
            Box::new(make_mlp_model(node_in, config, core_vb.pp("node_model"))?),
            Reducer::Sum,
        )?;

        Ok(Self {
            node_encoder,
            edge_encoder,
            core,
            num_processing_steps: config.num_processing_steps,
        })
    }

    /// Step count used by [`GraphModule::forward_t`].
    pub fn num_processing_steps(&self) -> usize {
        self.num_processing_steps
    }

    /// The shared interaction network.
    pub fn core(&self) -> &InteractionNetwork {
        &self.core
    }

    /// Encode raw node features into `latent0`.
    ///
    /// The input's own edge features, if any, are replaced.
    pub fn encode(&self, graph: &GraphsTuple, train: bool) -> Result<GraphsTuple> {
        let encoded = self.node_encoder.forward_t(graph, train)?;
        self.edge_encoder.forward_t(&encoded, train)
    }

    /// Encode and run `num_processing_steps` interaction rounds.
    pub fn forward_steps(
        &self,
        graph: &GraphsTuple,
        num_processing_steps: usize,
        train: bool,
    ) -> Result<GraphsTuple> {
        tracing::debug!(
            steps = num_processing_steps,
            nodes = graph.num_nodes(),
            edges = graph.num_edges(),
            train,
            "infomax encoder forward"
        );

        let latent0 = self.encode(graph, train)?;
        let mut latent = latent0.clone();
        for _ in 0..num_processing_steps {
            let core_input = concat_features(&[&latent0, &latent])?;
            latent = self.core.forward_t(&core_input, train)?;
        }
        Ok(latent)
    }
}

impl GraphModule for DeepGraphInfoMax {
    fn forward_t(&self, graph: &GraphsTuple, train: bool) -> Result<GraphsTuple> {
        self.forward_steps(graph, self.num_processing_steps, train)
    }
}

/// MLP scores squashed to probabilities.
struct ScoreHead {
    mlp: Mlp,
}

impl ModuleT for ScoreHead {
    fn forward_t(&self, xs: &Tensor, train: bool) -> CandleResult<Tensor> {
        candle_nn::ops::sigmoid(&self.mlp.forward_t(xs, train)?)
    }
}

/// Scores (latent, target) node pairs.
///
/// Node features are concatenated latent-then-target and mapped by a
/// node-only [`GraphIndependent`] to one probability per latent node.
pub struct Discriminator {
    network: GraphIndependent,
}

impl Discriminator {
    /// Discriminator for `latent_size` latents against `latent_size` summaries.
    pub fn new(config: &InfoMaxConfig, vb: VarBuilder) -> Result<Self> {
        let size = config.latent_size;
        Self::with_sizes(size, size, size, vb)
    }

    /// Create a discriminator.
    ///
    /// # Arguments
    /// - `latent_size`: Width of the latent node features
    /// - `target_size`: Width of the target node features
    /// - `hidden_size`: Hidden width of the scoring MLP
    /// - `vb`: Variable builder; the MLP is stored under `node_output`
    pub fn with_sizes(
        latent_size: usize,
        target_size: usize,
        hidden_size: usize,
        vb: VarBuilder,
    ) -> Result<Self> {
        let mlp = Mlp::new(
            latent_size + target_size,
            &[hidden_size, 1],
            false,
            None,
            vb.pp("node_output"),
        )?;
        Ok(Self::from_node_model(Box::new(ScoreHead { mlp })))
    }

    /// Wrap a custom per-node scoring model.
    pub fn from_node_model(model: BoxedModel) -> Self {
        Self {
            network: GraphIndependent::new(None, Some(model), None),
        }
    }

    /// Score every latent node against the target.
    ///
    /// The target must have one node row per latent node, or one row per
    /// graph (a [`ReadoutFunction`] summary), which is broadcast to the
    /// nodes of that graph. When both counts agree the target is read as a
    /// summary; use [`Discriminator::forward_pairs_t`] to force per-node
    /// pairing. The result is `latent` with nodes replaced by scores of
    /// shape `[N, 1]`.
    pub fn forward(&self, latent: &GraphsTuple, target: &GraphsTuple) -> Result<GraphsTuple> {
        self.forward_t(latent, target, false)
    }

    pub fn forward_t(
        &self,
        latent: &GraphsTuple,
        target: &GraphsTuple,
        train: bool,
    ) -> Result<GraphsTuple> {
        let rows = target.require_nodes()?.dim(0)?;
        if rows == latent.num_graphs() {
            self.forward_summary_t(latent, target, train)
        } else {
            self.forward_pairs_t(latent, target, train)
        }
    }

    /// Score each node against its own graph's row of `summary`.
    pub fn forward_summary_t(
        &self,
        latent: &GraphsTuple,
        summary: &GraphsTuple,
        train: bool,
    ) -> Result<GraphsTuple> {
        let summary_nodes = summary.require_nodes()?;
        let rows = summary_nodes.dim(0)?;
        if rows != latent.num_graphs() {
            return Err(Error::ShapeMismatch {
                what: "discriminator summary rows",
                expected: latent.num_graphs(),
                got: rows,
            });
        }
        let target_nodes = summary_nodes.index_select(&latent.node_graph_index()?, 0)?;
        self.score(latent, &target_nodes, train)
    }

    /// Score node `i` of `latent` against node `i` of `target`.
    pub fn forward_pairs_t(
        &self,
        latent: &GraphsTuple,
        target: &GraphsTuple,
        train: bool,
    ) -> Result<GraphsTuple> {
        let target_nodes = target.require_nodes()?;
        let n = latent.require_nodes()?.dim(0)?;
        let rows = target_nodes.dim(0)?;
        if rows != n {
            return Err(Error::ShapeMismatch {
                what: "discriminator target rows",
                expected: n,
                got: rows,
            });
        }
        self.score(latent, target_nodes, train)
    }

    fn score(
        &self,
        latent: &GraphsTuple,
        target_nodes: &Tensor,
        train: bool,
    ) -> Result<GraphsTuple> {
        let joined = Tensor::cat(&[latent.require_nodes()?, target_nodes], D::Minus1)?;
        self.network.forward_t(&latent.with_nodes(joined), train)
    }
}
