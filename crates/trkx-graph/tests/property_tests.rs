//! Property-based tests for graph records.
//!
//! These tests verify invariants that should hold for any graph:
//! - Batching keeps every index inside its own graph's node range
//! - Segment sums conserve the total of the input rows
//! - Feature concatenation adds widths and keeps counts

use candle_core::{DType, Device, Tensor};
use proptest::prelude::*;
use trkx_graph::{concat_features, segment_sum, GraphsTuple};

/// Generate a graph shape: node count and a list of (sender, receiver) pairs.
fn arb_graph_shape() -> impl Strategy<Value = (usize, Vec<(u32, u32)>)> {
    (1usize..8).prop_flat_map(|n| {
        let pair = (0..n as u32, 0..n as u32);
        (Just(n), prop::collection::vec(pair, 0..12))
    })
}

fn build(n: usize, pairs: &[(u32, u32)], width: usize) -> GraphsTuple {
    let device = Device::Cpu;
    let nodes = Tensor::ones((n, width), DType::F32, &device).unwrap();
    GraphsTuple::from_edge_list(nodes, None, pairs).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn batch_keeps_indices_in_own_range(
        shapes in prop::collection::vec(arb_graph_shape(), 1..5),
    ) {
        let graphs: Vec<GraphsTuple> = shapes.iter().map(|(n, p)| build(*n, p, 2)).collect();
        let batch = GraphsTuple::batch(&graphs).unwrap();

        prop_assert_eq!(batch.num_graphs(), graphs.len());
        prop_assert_eq!(batch.num_nodes(), shapes.iter().map(|(n, _)| n).sum::<usize>());

        let senders = batch.senders().to_vec1::<u32>().unwrap();
        let receivers = batch.receivers().to_vec1::<u32>().unwrap();
        let node_graph = batch.node_graph_index().unwrap().to_vec1::<u32>().unwrap();
        let edge_graph = batch.edge_graph_index().unwrap().to_vec1::<u32>().unwrap();

        for e in 0..batch.num_edges() {
            prop_assert_eq!(node_graph[senders[e] as usize], edge_graph[e]);
            prop_assert_eq!(node_graph[receivers[e] as usize], edge_graph[e]);
        }
    }

    #[test]
    fn segment_sum_conserves_total(
        (n, pairs) in arb_graph_shape(),
        values in prop::collection::vec(-4i32..4, 12),
    ) {
        let device = Device::Cpu;
        let e = pairs.len();
        let data: Vec<f32> = values[..e].iter().map(|&v| v as f32).collect();
        let data = Tensor::from_vec(data, (e, 1), &device).unwrap();
        let ids: Vec<u32> = pairs.iter().map(|&(s, _)| s).collect();
        let ids = Tensor::from_vec(ids, e, &device).unwrap();

        let out = segment_sum(&data, &ids, n).unwrap();
        prop_assert_eq!(out.dims(), &[n, 1]);

        let total_in: f32 = values[..e].iter().map(|&v| v as f32).sum();
        let total_out: f32 = out.flatten_all().unwrap().to_vec1::<f32>().unwrap().iter().sum();
        prop_assert!((total_in - total_out).abs() < 1e-4);
    }

    #[test]
    fn concat_features_adds_widths(
        (n, pairs) in arb_graph_shape(),
        a in 1usize..5,
        b in 1usize..5,
    ) {
        let g = build(n, &pairs, a);
        let h = build(n, &pairs, b);
        let cat = concat_features(&[&g, &h]).unwrap();

        prop_assert_eq!(cat.nodes().unwrap().dims(), &[n, a + b]);
        prop_assert_eq!(cat.num_edges(), pairs.len());
        prop_assert!(cat.validate().is_ok());
    }
}
