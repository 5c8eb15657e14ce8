//! The full InfoMax forward pass and its contrastive loss.

use candle_core::Tensor;
use candle_nn::VarBuilder;
use rand::Rng;
use trkx_graph::GraphsTuple;

use crate::config::InfoMaxConfig;
use crate::error::Result;
use crate::infomax::{CorruptionFunction, DeepGraphInfoMax, Discriminator, ReadoutFunction};
use crate::module::GraphModule;

/// Everything one InfoMax step produces.
#[derive(Debug, Clone)]
pub struct InfoMaxOutput {
    /// Encoder output for the real graph.
    pub latent: GraphsTuple,
    /// Encoder output for the corrupted graph.
    pub corrupted_latent: GraphsTuple,
    /// Readout of `latent`, one row per graph.
    pub summary: GraphsTuple,
    /// Discriminator scores of (real latent, summary), `[N, 1]`.
    pub positive: Tensor,
    /// Discriminator scores of (corrupted latent, summary), `[N, 1]`.
    pub negative: Tensor,
}

/// Encoder, corruption, readout and discriminator wired together.
pub struct InfoMax {
    config: InfoMaxConfig,
    encoder: DeepGraphInfoMax,
    corruption: CorruptionFunction,
    readout: ReadoutFunction,
    discriminator: Discriminator,
}

impl InfoMax {
    /// Build all networks. Parameters go under `encoder` and `discriminator`.
    pub fn new(config: InfoMaxConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;
        let encoder = DeepGraphInfoMax::new(&config, vb.pp("encoder"))?;
        let discriminator = Discriminator::new(&config, vb.pp("discriminator"))?;
        Ok(Self {
            config,
            encoder,
            corruption: CorruptionFunction::new(),
            readout: ReadoutFunction::new(),
            discriminator,
        })
    }

    pub fn config(&self) -> &InfoMaxConfig {
        &self.config
    }

    pub fn encoder(&self) -> &DeepGraphInfoMax {
        &self.encoder
    }

    pub fn discriminator(&self) -> &Discriminator {
        &self.discriminator
    }

    /// Run one step, corrupting with the thread-local random source.
    pub fn forward_t(&self, graph: &GraphsTuple, train: bool) -> Result<InfoMaxOutput> {
        self.forward_with_rng(graph, train, &mut rand::rng())
    }

    /// Run one step with a caller-supplied random source for the corruption.
    pub fn forward_with_rng<R: Rng + ?Sized>(
        &self,
        graph: &GraphsTuple,
        train: bool,
        rng: &mut R,
    ) -> Result<InfoMaxOutput> {
        let steps = self.config.num_processing_steps;

        let latent = self.encoder.forward_steps(graph, steps, train)?;
        let corrupted = self.corruption.corrupt_with_rng(graph, rng)?;
        let corrupted_latent = self.encoder.forward_steps(&corrupted, steps, train)?;
        let summary = self.readout.forward(&latent)?;

        let positive = self.discriminator.forward_summary_t(&latent, &summary, train)?;
        let negative = self
            .discriminator
            .forward_summary_t(&corrupted_latent, &summary, train)?;

        Ok(InfoMaxOutput {
            positive: positive.require_nodes()?.clone(),
            negative: negative.require_nodes()?.clone(),
            latent,
            corrupted_latent,
            summary,
        })
    }

    /// Contrastive loss of an output, see [`infomax_loss`].
    pub fn loss(&self, output: &InfoMaxOutput) -> Result<Tensor> {
        let loss = infomax_loss(&output.positive, &output.negative, self.config.loss_eps)?;
        tracing::debug!(loss = ?loss.to_scalar::<f32>().ok(), "infomax loss");
        Ok(loss)
    }
}

/// Binary cross-entropy with real pairs labelled 1 and corrupted pairs 0.
///
/// ```text
/// L = -(mean(log p) + mean(log(1 - q))) / 2
/// ```
///
/// Probabilities are squeezed into `[eps, 1 - eps]` before the log.
pub fn infomax_loss(positive: &Tensor, negative: &Tensor, eps: f64) -> Result<Tensor> {
    let scale = 1.0 - 2.0 * eps;
    let real = positive.affine(scale, eps)?.log()?.mean_all()?;
    // (1 - q) squeezed: (1 - q) * scale + eps
    let fake = negative.affine(-scale, 1.0 - eps)?.log()?.mean_all()?;
    Ok((real + fake)?.affine(-0.5, 0.0)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_loss_perfect_discriminator() {
        let device = Device::Cpu;
        let pos = Tensor::ones((4, 1), DType::F32, &device).unwrap();
        let neg = Tensor::zeros((4, 1), DType::F32, &device).unwrap();

        let loss = infomax_loss(&pos, &neg, 1e-7).unwrap().to_scalar::<f32>().unwrap();
        assert!(loss.abs() < 1e-5, "loss {loss}");
    }

    #[test]
    fn test_loss_uninformed_discriminator() {
        let device = Device::Cpu;
        let half = Tensor::full(0.5f32, (4, 1), &device).unwrap();

        let loss = infomax_loss(&half, &half, 1e-7).unwrap().to_scalar::<f32>().unwrap();
        assert!((loss - std::f32::consts::LN_2).abs() < 1e-4, "loss {loss}");
    }

    #[test]
    fn test_loss_finite_when_wrong() {
        let device = Device::Cpu;
        let pos = Tensor::zeros((2, 1), DType::F32, &device).unwrap();
        let neg = Tensor::ones((2, 1), DType::F32, &device).unwrap();

        let loss = infomax_loss(&pos, &neg, 1e-6).unwrap().to_scalar::<f32>().unwrap();
        assert!(loss.is_finite());
        assert!(loss > 10.0);
    }
}
