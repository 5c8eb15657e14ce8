//! Feed-forward sub-networks.
//!
//! - [`Mlp`]: a stack of dense layers with ReLU, optional dropout
//! - [`MlpBlock`]: an [`Mlp`] followed by layer normalization
//! - [`make_mlp_model`]: the block factory used by every learned update
//!
//! # Parameter ownership
//!
//! Parameters live in whatever `VarMap` backs the `VarBuilder`. A network
//! built under prefix `p` owns exactly the variables `p.*`, so two networks
//! built under different prefixes never share weights. Building twice under
//! the same prefix returns the same variables, which is how weights are
//! deliberately tied; callers that want fresh weights pick a fresh prefix.

use candle_core::{bail, Result, Tensor};
use candle_nn::{layer_norm, linear, Dropout, LayerNorm, Linear, Module, ModuleT, VarBuilder};

use crate::config::InfoMaxConfig;

/// Dense layers with ReLU activations.
///
/// Dropout, when enabled, follows every hidden activation and is only
/// applied in training mode. The last layer is activated only with
/// `activate_final`.
#[derive(Debug, Clone)]
pub struct Mlp {
    layers: Vec<Linear>,
    activate_final: bool,
    dropout: Option<Dropout>,
    output_size: usize,
}

impl Mlp {
    /// Create a new MLP.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `output_sizes`: Width of each dense layer, last entry is the output width
    /// - `activate_final`: Apply ReLU after the last layer too
    /// - `dropout`: Dropout rate after hidden activations
    /// - `vb`: Variable builder; layers are stored under `linear_{i}`
    pub fn new(
        in_features: usize,
        output_sizes: &[usize],
        activate_final: bool,
        dropout: Option<f32>,
        vb: VarBuilder,
    ) -> Result<Self> {
        let Some(&output_size) = output_sizes.last() else {
            bail!("mlp needs at least one layer")
        };

        let mut layers = Vec::with_capacity(output_sizes.len());
        let mut dim = in_features;
        for (i, &out) in output_sizes.iter().enumerate() {
            layers.push(linear(dim, out, vb.pp(format!("linear_{i}")))?);
            dim = out;
        }

        Ok(Self {
            layers,
            activate_final,
            dropout: dropout.map(Dropout::new),
            output_size,
        })
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }
}

impl ModuleT for Mlp {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let last = self.layers.len() - 1;
        let mut h = xs.clone();
        for (i, layer) in self.layers.iter().enumerate() {
            h = layer.forward(&h)?;
            if i < last {
                h = h.relu()?;
                if let Some(dropout) = &self.dropout {
                    h = dropout.forward(&h, train)?;
                }
            } else if self.activate_final {
                h = h.relu()?;
            }
        }
        Ok(h)
    }
}

/// An [`Mlp`] with activated output followed by `LayerNorm`.
#[derive(Debug, Clone)]
pub struct MlpBlock {
    mlp: Mlp,
    norm: LayerNorm,
}

impl MlpBlock {
    pub fn output_size(&self) -> usize {
        self.mlp.output_size()
    }
}

impl ModuleT for MlpBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let h = self.mlp.forward_t(xs, train)?;
        self.norm.forward(&h)
    }
}

/// Build a fresh MLP block.
///
/// `config.num_layers` dense layers of width `config.latent_size`, every
/// layer ReLU-activated, then layer normalization over the latent width.
///
/// # Arguments
/// - `in_features`: Input feature dimension
/// - `config`: Latent width, depth and normalization epsilon
/// - `vb`: Variable builder under a prefix no other network uses
pub fn make_mlp_model(in_features: usize, config: &InfoMaxConfig, vb: VarBuilder) -> Result<MlpBlock> {
    let sizes = vec![config.latent_size; config.num_layers];
    let mlp = Mlp::new(in_features, &sizes, true, None, vb.pp("mlp"))?;
    let norm = layer_norm(config.latent_size, config.layer_norm_eps, vb.pp("layer_norm"))?;
    Ok(MlpBlock { mlp, norm })
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn small_config() -> InfoMaxConfig {
        InfoMaxConfig {
            latent_size: 16,
            ..Default::default()
        }
    }

    #[test]
    fn test_mlp_block_shape() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let block = make_mlp_model(4, &small_config(), vb).unwrap();
        let x = Tensor::randn(0f32, 1f32, (5, 4), &device).unwrap();

        let out = block.forward_t(&x, false).unwrap();
        assert_eq!(out.dims(), &[5, 16]);
        assert_eq!(block.output_size(), 16);
    }

    #[test]
    fn test_mlp_block_is_normalized() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let block = make_mlp_model(4, &small_config(), vb).unwrap();
        let x = Tensor::randn(0f32, 1f32, (6, 4), &device).unwrap();
        let out = block.forward_t(&x, false).unwrap();

        // Fresh LayerNorm has unit scale and zero shift: every row is centered.
        let means = out.mean(1).unwrap().to_vec1::<f32>().unwrap();
        for m in means {
            assert!(m.abs() < 1e-4, "row mean {m} not centered");
        }
    }

    #[test]
    fn test_factory_calls_do_not_share_parameters() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = small_config();

        let a = make_mlp_model(4, &config, vb.pp("a")).unwrap();
        let b = make_mlp_model(4, &config, vb.pp("b")).unwrap();

        // 2 dense layers (weight, bias) + LayerNorm (weight, bias), per block
        assert_eq!(varmap.all_vars().len(), 12);

        let x = Tensor::randn(0f32, 1f32, (5, 4), &device).unwrap();
        let ya = a.forward_t(&x, false).unwrap();
        let yb = b.forward_t(&x, false).unwrap();
        let diff = (ya - yb)
            .unwrap()
            .abs()
            .unwrap()
            .sum_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff > 0.0);
    }

    #[test]
    fn test_mlp_final_layer_not_activated() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let mlp = Mlp::new(3, &[8, 1], false, None, vb).unwrap();
        let x = Tensor::randn(0f32, 1f32, (64, 3), &device).unwrap();
        let out = mlp.forward_t(&x, false).unwrap();

        assert_eq!(out.dims(), &[64, 1]);
        assert_eq!(mlp.output_size(), 1);
    }

    #[test]
    fn test_mlp_dropout_only_in_training() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);

        let mlp = Mlp::new(4, &[32, 32], true, Some(0.5), vb).unwrap();
        let x = Tensor::randn(0f32, 1f32, (10, 4), &device).unwrap();

        let a = mlp.forward_t(&x, false).unwrap().to_vec2::<f32>().unwrap();
        let b = mlp.forward_t(&x, false).unwrap().to_vec2::<f32>().unwrap();
        assert_eq!(a, b);

        let t1 = mlp.forward_t(&x, true).unwrap().to_vec2::<f32>().unwrap();
        let t2 = mlp.forward_t(&x, true).unwrap().to_vec2::<f32>().unwrap();
        assert_ne!(t1, a);
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_mlp_needs_a_layer() {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        assert!(Mlp::new(4, &[], true, None, vb).is_err());
    }
}
