//! Gather and scatter operations over graph connectivity.
//!
//! Message passing moves features in two directions:
//!
//! ```text
//! gather:  nodes (N x F) --index_select(senders | receivers)--> edges (E x F)
//! scatter: edges (E x F) --index_add(senders | receivers)-----> nodes (N x F)
//! ```
//!
//! Scatter reductions are order independent and always produce one row per
//! segment. A segment that receives nothing yields the zero vector.

use candle_core::Tensor;

use crate::error::{Error, Result};
use crate::graph::GraphsTuple;

/// Sum rows of `data` that share a segment id.
///
/// # Arguments
/// - `data`: Rows to reduce (E x F)
/// - `segment_ids`: Target segment of each row (E), values in `[0, num_segments)`
/// - `num_segments`: Number of output rows
///
/// # Returns
/// - Segment sums (num_segments x F)
pub fn segment_sum(data: &Tensor, segment_ids: &Tensor, num_segments: usize) -> Result<Tensor> {
    let (rows, features) = data.dims2()?;
    let ids = segment_ids.dim(0)?;
    if ids != rows {
        return Err(Error::ShapeMismatch {
            what: "segment ids",
            expected: rows,
            got: ids,
        });
    }

    let out = Tensor::zeros((num_segments, features), data.dtype(), data.device())?;
    if rows == 0 {
        return Ok(out);
    }
    Ok(out.index_add(segment_ids, data, 0)?)
}

/// Average rows of `data` that share a segment id. Empty segments are zero.
pub fn segment_mean(data: &Tensor, segment_ids: &Tensor, num_segments: usize) -> Result<Tensor> {
    let mut counts = vec![0f32; num_segments];
    for id in segment_ids.to_vec1::<u32>()? {
        let count = counts.get_mut(id as usize).ok_or(Error::IndexOutOfRange {
            what: "segment ids",
            index: id,
            bound: num_segments,
        })?;
        *count += 1.0;
    }
    let sums = segment_sum(data, segment_ids, num_segments)?;
    // Empty segments divide a zero sum by one.
    let counts: Vec<f32> = counts.into_iter().map(|c| c.max(1.0)).collect();
    let counts =
        Tensor::from_vec(counts, (num_segments, 1), data.device())?.to_dtype(data.dtype())?;

    Ok(sums.broadcast_div(&counts)?)
}

/// Node features of each edge's sender (E x F_n).
pub fn broadcast_sender_nodes_to_edges(graph: &GraphsTuple) -> Result<Tensor> {
    Ok(graph.require_nodes()?.index_select(graph.senders(), 0)?)
}

/// Node features of each edge's receiver (E x F_n).
pub fn broadcast_receiver_nodes_to_edges(graph: &GraphsTuple) -> Result<Tensor> {
    Ok(graph.require_nodes()?.index_select(graph.receivers(), 0)?)
}

/// Global features of each edge's graph (E x F_g).
pub fn broadcast_globals_to_edges(graph: &GraphsTuple) -> Result<Tensor> {
    let globals = graph.require_globals()?;
    Ok(globals.index_select(&graph.edge_graph_index()?, 0)?)
}

/// Global features of each node's graph (N x F_g).
pub fn broadcast_globals_to_nodes(graph: &GraphsTuple) -> Result<Tensor> {
    let globals = graph.require_globals()?;
    Ok(globals.index_select(&graph.node_graph_index()?, 0)?)
}

/// Sum of edge features over the edges each node receives (N x F_e).
pub fn received_edges_to_nodes_aggregator(graph: &GraphsTuple) -> Result<Tensor> {
    segment_sum(graph.require_edges()?, graph.receivers(), graph.num_nodes())
}

/// Sum of edge features over the edges each node sends (N x F_e).
pub fn sent_edges_to_nodes_aggregator(graph: &GraphsTuple) -> Result<Tensor> {
    segment_sum(graph.require_edges()?, graph.senders(), graph.num_nodes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_segment_sum_basic() {
        let device = Device::Cpu;
        let data = Tensor::new(&[[1f32, 1.], [2., 2.], [4., 4.]], &device).unwrap();
        let ids = Tensor::new(&[0u32, 2, 0], &device).unwrap();

        let out = segment_sum(&data, &ids, 3).unwrap();
        assert_eq!(
            out.to_vec2::<f32>().unwrap(),
            vec![vec![5., 5.], vec![0., 0.], vec![2., 2.]]
        );
    }

    #[test]
    fn test_segment_sum_no_rows() {
        let device = Device::Cpu;
        let data = Tensor::zeros((0, 3), DType::F32, &device).unwrap();
        let ids = Tensor::zeros(0, DType::U32, &device).unwrap();

        let out = segment_sum(&data, &ids, 2).unwrap();
        assert_eq!(out.dims(), &[2, 3]);
        assert_eq!(out.to_vec2::<f32>().unwrap(), vec![vec![0.; 3]; 2]);
    }

    #[test]
    fn test_segment_sum_id_count_checked() {
        let device = Device::Cpu;
        let data = Tensor::ones((3, 2), DType::F32, &device).unwrap();
        let ids = Tensor::new(&[0u32, 1], &device).unwrap();
        assert!(segment_sum(&data, &ids, 2).is_err());
    }

    #[test]
    fn test_segment_mean() {
        let device = Device::Cpu;
        let data = Tensor::new(&[[2f32], [4.], [9.]], &device).unwrap();
        let ids = Tensor::new(&[1u32, 1, 0], &device).unwrap();

        let out = segment_mean(&data, &ids, 3).unwrap();
        assert_eq!(out.to_vec2::<f32>().unwrap(), vec![vec![9.], vec![3.], vec![0.]]);
    }

    #[test]
    fn test_segment_mean_id_out_of_range() {
        let device = Device::Cpu;
        let data = Tensor::ones((2, 1), DType::F32, &device).unwrap();
        let ids = Tensor::new(&[0u32, 3], &device).unwrap();

        let err = segment_mean(&data, &ids, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::IndexOutOfRange { index: 3, bound: 2, .. }
        ));
    }

    #[test]
    fn test_gather_and_scatter_directions() {
        let device = Device::Cpu;
        let nodes = Tensor::new(&[[10f32], [20.], [30.]], &device).unwrap();
        let edges = Tensor::new(&[[1f32], [2.]], &device).unwrap();
        let g = GraphsTuple::from_edge_list(nodes, Some(edges), &[(0, 1), (1, 2)]).unwrap();

        let s = broadcast_sender_nodes_to_edges(&g).unwrap();
        let r = broadcast_receiver_nodes_to_edges(&g).unwrap();
        assert_eq!(s.to_vec2::<f32>().unwrap(), vec![vec![10.], vec![20.]]);
        assert_eq!(r.to_vec2::<f32>().unwrap(), vec![vec![20.], vec![30.]]);

        let sent = sent_edges_to_nodes_aggregator(&g).unwrap();
        let received = received_edges_to_nodes_aggregator(&g).unwrap();
        // node 2 sends nothing; node 0 receives nothing
        assert_eq!(sent.to_vec2::<f32>().unwrap(), vec![vec![1.], vec![2.], vec![0.]]);
        assert_eq!(received.to_vec2::<f32>().unwrap(), vec![vec![0.], vec![1.], vec![2.]]);
    }

    #[test]
    fn test_missing_edges_reported() {
        let device = Device::Cpu;
        let nodes = Tensor::zeros((2, 1), DType::F32, &device).unwrap();
        let g = GraphsTuple::from_edge_list(nodes, None, &[(0, 1)]).unwrap();
        assert!(matches!(
            sent_edges_to_nodes_aggregator(&g),
            Err(Error::MissingField("edges"))
        ));
    }

    #[test]
    fn test_globals_broadcast_per_graph() {
        let device = Device::Cpu;
        let a = GraphsTuple::from_edge_list(
            Tensor::zeros((2, 1), DType::F32, &device).unwrap(),
            None,
            &[(0, 1)],
        )
        .unwrap();
        let b = GraphsTuple::from_edge_list(
            Tensor::zeros((1, 1), DType::F32, &device).unwrap(),
            None,
            &[(0, 0)],
        )
        .unwrap();
        let batch = GraphsTuple::batch(&[a, b]).unwrap();
        let batch = batch.with_globals(Tensor::new(&[[1f32], [2.]], &device).unwrap());

        let per_node = broadcast_globals_to_nodes(&batch).unwrap();
        let per_edge = broadcast_globals_to_edges(&batch).unwrap();
        assert_eq!(per_node.to_vec2::<f32>().unwrap(), vec![vec![1.], vec![1.], vec![2.]]);
        assert_eq!(per_edge.to_vec2::<f32>().unwrap(), vec![vec![1.], vec![2.]]);
    }
}
