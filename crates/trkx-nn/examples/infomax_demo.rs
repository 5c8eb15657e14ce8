//! Score a random track graph with an untrained InfoMax model.
//!
//! Hits are placed on concentric layers; each hit on layer l is linked to
//! the two nearest-in-phi hits on layer l + 1.
//!
//! ```text
//! RUST_LOG=debug cargo run -p trkx-nn --example infomax_demo
//! ```

use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use rand::Rng;
use trkx_graph::GraphsTuple;
use trkx_nn::{InfoMax, InfoMaxConfig};

const NUM_LAYERS: usize = 4;
const HITS_PER_LAYER: usize = 8;

fn main() -> trkx_nn::Result<()> {
    tracing_subscriber::fmt::init();

    let device = Device::Cpu;
    let mut rng = rand::rng();

    // (r, phi, z) per hit
    let mut hits = Vec::with_capacity(NUM_LAYERS * HITS_PER_LAYER * 3);
    let mut phis = Vec::with_capacity(NUM_LAYERS * HITS_PER_LAYER);
    for layer in 0..NUM_LAYERS {
        for _ in 0..HITS_PER_LAYER {
            let phi: f32 = rng.random_range(-std::f32::consts::PI..std::f32::consts::PI);
            let z: f32 = rng.random_range(-1.0..1.0);
            hits.extend_from_slice(&[(layer + 1) as f32 * 0.25, phi, z]);
            phis.push(phi);
        }
    }

    let mut segments = Vec::new();
    for layer in 0..NUM_LAYERS - 1 {
        for i in 0..HITS_PER_LAYER {
            let sender = layer * HITS_PER_LAYER + i;
            let next_layer = (layer + 1) * HITS_PER_LAYER..(layer + 2) * HITS_PER_LAYER;
            let mut next: Vec<usize> = next_layer.collect();
            next.sort_by(|&a, &b| {
                let da = (phis[a] - phis[sender]).abs();
                let db = (phis[b] - phis[sender]).abs();
                da.total_cmp(&db)
            });
            for &receiver in next.iter().take(2) {
                segments.push((sender as u32, receiver as u32));
            }
        }
    }

    let num_hits = NUM_LAYERS * HITS_PER_LAYER;
    let nodes = Tensor::from_vec(hits, (num_hits, 3), &device)?;
    let graph = GraphsTuple::from_edge_list(nodes, None, &segments)?;

    let config = InfoMaxConfig {
        latent_size: 32,
        ..Default::default()
    };
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
    let model = InfoMax::new(config, vb)?;

    let output = model.forward_t(&graph, false)?;
    let loss = model.loss(&output)?.to_scalar::<f32>()?;

    let positive = output.positive.mean_all()?.to_scalar::<f32>()?;
    let negative = output.negative.mean_all()?.to_scalar::<f32>()?;
    println!("hits: {num_hits}, segments: {}", segments.len());
    println!("mean real score: {positive:.4}, mean corrupted score: {negative:.4}");
    println!("infomax loss: {loss:.4}");
    Ok(())
}
