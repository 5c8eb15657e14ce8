//! Model configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sizes and hyper-parameters shared by the InfoMax networks.
///
/// Missing keys in a JSON file fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoMaxConfig {
    /// Width of the raw node features (hit r, phi, z by default).
    pub node_input_size: usize,
    /// Width of every hidden and latent layer.
    pub latent_size: usize,
    /// Dense layers per MLP block.
    pub num_layers: usize,
    /// Interaction network rounds run by the encoder.
    pub num_processing_steps: usize,
    /// Epsilon of the layer normalization after each MLP block.
    pub layer_norm_eps: f64,
    /// Dropout rate of the edge encoder in training mode.
    pub edge_dropout: f32,
    /// Probability clamp used by the contrastive loss.
    pub loss_eps: f64,
}

impl Default for InfoMaxConfig {
    fn default() -> Self {
        Self {
            node_input_size: 3,
            latent_size: 128,
            num_layers: 2,
            num_processing_steps: 4,
            layer_norm_eps: 1e-5,
            edge_dropout: 0.5,
            loss_eps: 1e-7,
        }
    }
}

impl InfoMaxConfig {
    /// Parse a configuration from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject sizes and rates the networks cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.node_input_size == 0 {
            return Err(Error::InvalidConfig("node_input_size must be > 0".into()));
        }
        if self.latent_size == 0 {
            return Err(Error::InvalidConfig("latent_size must be > 0".into()));
        }
        if self.num_layers == 0 {
            return Err(Error::InvalidConfig("num_layers must be > 0".into()));
        }
        if !(0.0..1.0).contains(&self.edge_dropout) {
            return Err(Error::InvalidConfig(format!(
                "edge_dropout must be in [0, 1), got {}",
                self.edge_dropout
            )));
        }
        if !(self.loss_eps > 0.0 && self.loss_eps < 0.5) {
            return Err(Error::InvalidConfig(format!(
                "loss_eps must be in (0, 0.5), got {}",
                self.loss_eps
            )));
        }
        Ok(())
    }
}
