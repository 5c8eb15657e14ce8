//! Deep Graph InfoMax networks for track graphs.
//!
//! Hits are nodes, candidate segments between hits are edges. The networks
//! here learn a latent representation of every hit without labels, by
//! teaching a discriminator to tell the real graph from one whose edges
//! were rewired at random.
//!
//! ## Building Blocks
//!
//! Everything is assembled from two message-passing blocks:
//!
//! ```text
//! EdgeBlock: e'_k = φ_e([e_k, v_rk, v_sk])           per edge
//! NodeBlock: v'_i = φ_v([Σ e'_k, v_i])                per node
//! ```
//!
//! An [`InteractionNetwork`] is an edge block followed by a node block.
//! Each φ is a fresh [`MlpBlock`] (two ReLU dense layers + LayerNorm) from
//! [`make_mlp_model`].
//!
//! ## The InfoMax Encoder
//!
//! ```text
//! latent0 = EdgeEncoder(NodeEncoder(G))
//! latent  = latent0
//! repeat K times:
//!     latent = InteractionNetwork(concat(latent0, latent))
//! ```
//!
//! Concatenating `latent0` into every round is a skip connection: later
//! rounds can always recover the original hit encoding.
//!
//! ## Contrastive Training Signal
//!
//! | Pair | Expected score |
//! |------|----------------|
//! | (latent of G, summary of G) | 1 |
//! | (latent of corrupt(G), summary of G) | 0 |
//!
//! [`InfoMax`] runs both encoder passes, the readout and the discriminator;
//! [`infomax_loss`] turns the scores into a binary cross-entropy.
//!
//! ## Modules
//!
//! - [`mlp`]: MLP and MLP-block factory
//! - [`blocks`]: edge and node update blocks
//! - [`modules`]: graph-independent wrapper, interaction network
//! - [`infomax`]: corruption, readout, encoder, discriminator
//! - [`pipeline`]: full forward pass and loss
//! - [`config`]: sizes and hyper-parameters
//!
//! ## Example
//!
//! ```rust,ignore
//! use candle_core::{DType, Device, Tensor};
//! use candle_nn::{VarBuilder, VarMap};
//! use trkx_graph::GraphsTuple;
//! use trkx_nn::{InfoMax, InfoMaxConfig};
//!
//! let device = Device::Cpu;
//! let varmap = VarMap::new();
//! let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
//! let model = InfoMax::new(InfoMaxConfig::default(), vb)?;
//!
//! let hits = Tensor::randn(0f32, 1f32, (100, 3), &device)?;
//! let graph = GraphsTuple::from_edge_list(hits, None, &segments)?;
//! let output = model.forward_t(&graph, true)?;
//! let loss = model.loss(&output)?;
//! ```

pub mod blocks;
pub mod config;
pub mod error;
pub mod infomax;
pub mod mlp;
pub mod module;
pub mod modules;
pub mod pipeline;

pub use blocks::{EdgeBlock, EdgeBlockOptions, NodeBlock, NodeBlockOptions, Reducer};
pub use config::InfoMaxConfig;
pub use error::{Error, Result};
pub use infomax::{CorruptionFunction, DeepGraphInfoMax, Discriminator, ReadoutFunction};
pub use mlp::{make_mlp_model, Mlp, MlpBlock};
pub use module::{BoxedModel, GraphModule};
pub use modules::{GraphIndependent, InteractionNetwork};
pub use pipeline::{infomax_loss, InfoMax, InfoMaxOutput};
