//! The graph record.
//!
//! A [`GraphsTuple`] holds one graph or a batch of graphs flattened into a
//! single disjoint union. Node and edge features are 2-D tensors whose first
//! axis is the element axis and whose last axis is the feature axis.
//!
//! The record is never mutated in place: every `with_*` / `without_*`
//! returns a new record. Tensors are reference counted, so replacing one
//! field does not copy the others.

use candle_core::{DType, Device, Tensor, D};

use crate::error::{Error, Result};

/// One graph, or a batch of graphs sharing a single index space.
#[derive(Debug, Clone)]
pub struct GraphsTuple {
    nodes: Option<Tensor>,
    edges: Option<Tensor>,
    senders: Tensor,
    receivers: Tensor,
    globals: Option<Tensor>,
    n_node: Vec<usize>,
    n_edge: Vec<usize>,
}

impl GraphsTuple {
    /// Create a single graph.
    ///
    /// # Arguments
    /// - `nodes`: Node features (N x F_n)
    /// - `edges`: Optional edge features (E x F_e)
    /// - `senders`, `receivers`: Edge endpoints (E), any integer dtype
    pub fn new(
        nodes: Tensor,
        edges: Option<Tensor>,
        senders: Tensor,
        receivers: Tensor,
    ) -> Result<Self> {
        let n_node = vec![nodes.dim(0)?];
        let n_edge = vec![senders.dim(0)?];
        Self::from_parts(Some(nodes), edges, senders, receivers, None, n_node, n_edge)
    }

    /// Create a single graph from `(sender, receiver)` pairs.
    pub fn from_edge_list(
        nodes: Tensor,
        edges: Option<Tensor>,
        pairs: &[(u32, u32)],
    ) -> Result<Self> {
        let device = nodes.device().clone();
        let (senders, receivers): (Vec<u32>, Vec<u32>) = pairs.iter().copied().unzip();
        let senders = Tensor::from_vec(senders, pairs.len(), &device)?;
        let receivers = Tensor::from_vec(receivers, pairs.len(), &device)?;
        Self::new(nodes, edges, senders, receivers)
    }

    /// Create a record from every field, including the per-graph counts of a
    /// batch. Fails if the record is inconsistent.
    pub fn from_parts(
        nodes: Option<Tensor>,
        edges: Option<Tensor>,
        senders: Tensor,
        receivers: Tensor,
        globals: Option<Tensor>,
        n_node: Vec<usize>,
        n_edge: Vec<usize>,
    ) -> Result<Self> {
        if n_node.len() != n_edge.len() {
            return Err(Error::ShapeMismatch {
                what: "n_edge length",
                expected: n_node.len(),
                got: n_edge.len(),
            });
        }
        let graph = Self {
            nodes,
            edges,
            senders: senders.to_dtype(DType::U32)?,
            receivers: receivers.to_dtype(DType::U32)?,
            globals,
            n_node,
            n_edge,
        };
        graph.validate()?;
        Ok(graph)
    }

    /// Check the record invariants.
    ///
    /// - `senders` and `receivers` are rank 1 with `sum(n_edge)` entries
    /// - every index is below `sum(n_node)`
    /// - present feature tensors have one row per node / edge / graph
    pub fn validate(&self) -> Result<()> {
        let n = self.num_nodes();
        let e = self.num_edges();

        for (what, idx) in [("senders", &self.senders), ("receivers", &self.receivers)] {
            if idx.rank() != 1 {
                return Err(Error::ShapeMismatch {
                    what: "index rank",
                    expected: 1,
                    got: idx.rank(),
                });
            }
            let len = idx.dim(0)?;
            if len != e {
                return Err(Error::ShapeMismatch {
                    what,
                    expected: e,
                    got: len,
                });
            }
            if let Some(&index) = idx.to_vec1::<u32>()?.iter().find(|&&i| i as usize >= n) {
                return Err(Error::IndexOutOfRange {
                    what,
                    index,
                    bound: n,
                });
            }
        }

        check_rows("nodes", self.nodes.as_ref(), n)?;
        check_rows("edges", self.edges.as_ref(), e)?;
        check_rows("globals", self.globals.as_ref(), self.num_graphs())?;
        Ok(())
    }

    pub fn nodes(&self) -> Option<&Tensor> {
        self.nodes.as_ref()
    }

    pub fn edges(&self) -> Option<&Tensor> {
        self.edges.as_ref()
    }

    pub fn globals(&self) -> Option<&Tensor> {
        self.globals.as_ref()
    }

    pub fn senders(&self) -> &Tensor {
        &self.senders
    }

    pub fn receivers(&self) -> &Tensor {
        &self.receivers
    }

    /// Node count of each graph in the batch.
    pub fn n_node(&self) -> &[usize] {
        &self.n_node
    }

    /// Edge count of each graph in the batch.
    pub fn n_edge(&self) -> &[usize] {
        &self.n_edge
    }

    pub fn num_nodes(&self) -> usize {
        self.n_node.iter().sum()
    }

    pub fn num_edges(&self) -> usize {
        self.n_edge.iter().sum()
    }

    pub fn num_graphs(&self) -> usize {
        self.n_node.len()
    }

    pub fn device(&self) -> &Device {
        self.senders.device()
    }

    /// Node features, or [`Error::MissingField`].
    pub fn require_nodes(&self) -> Result<&Tensor> {
        self.nodes.as_ref().ok_or(Error::MissingField("nodes"))
    }

    /// Edge features, or [`Error::MissingField`].
    pub fn require_edges(&self) -> Result<&Tensor> {
        self.edges.as_ref().ok_or(Error::MissingField("edges"))
    }

    /// Global features, or [`Error::MissingField`].
    pub fn require_globals(&self) -> Result<&Tensor> {
        self.globals.as_ref().ok_or(Error::MissingField("globals"))
    }

    /// Replace node features.
    ///
    /// Row counts are not checked: a readout legitimately replaces N node
    /// rows with one row per graph. Call [`validate`](Self::validate) when
    /// the result must be a well-formed graph.
    pub fn with_nodes(&self, nodes: Tensor) -> Self {
        Self {
            nodes: Some(nodes),
            ..self.clone()
        }
    }

    pub fn without_nodes(&self) -> Self {
        Self {
            nodes: None,
            ..self.clone()
        }
    }

    /// Replace edge features. Row counts are not checked.
    pub fn with_edges(&self, edges: Tensor) -> Self {
        Self {
            edges: Some(edges),
            ..self.clone()
        }
    }

    pub fn without_edges(&self) -> Self {
        Self {
            edges: None,
            ..self.clone()
        }
    }

    /// Replace global features. Row counts are not checked.
    pub fn with_globals(&self, globals: Tensor) -> Self {
        Self {
            globals: Some(globals),
            ..self.clone()
        }
    }

    pub fn without_globals(&self) -> Self {
        Self {
            globals: None,
            ..self.clone()
        }
    }

    /// Replace the receiver indices, keeping the edge count.
    pub fn with_receivers(&self, receivers: Tensor) -> Result<Self> {
        let receivers = self.checked_index("receivers", receivers)?;
        Ok(Self {
            receivers,
            ..self.clone()
        })
    }

    /// Replace the sender indices, keeping the edge count.
    pub fn with_senders(&self, senders: Tensor) -> Result<Self> {
        let senders = self.checked_index("senders", senders)?;
        Ok(Self {
            senders,
            ..self.clone()
        })
    }

    fn checked_index(&self, what: &'static str, idx: Tensor) -> Result<Tensor> {
        let idx = idx.to_dtype(DType::U32)?;
        if idx.rank() != 1 {
            return Err(Error::ShapeMismatch {
                what: "index rank",
                expected: 1,
                got: idx.rank(),
            });
        }
        let len = idx.dim(0)?;
        if len != self.num_edges() {
            return Err(Error::ShapeMismatch {
                what,
                expected: self.num_edges(),
                got: len,
            });
        }
        Ok(idx)
    }

    /// Index of the owning graph for every node (N).
    pub fn node_graph_index(&self) -> Result<Tensor> {
        repeat_index(&self.n_node, self.device())
    }

    /// Index of the owning graph for every edge (E).
    pub fn edge_graph_index(&self) -> Result<Tensor> {
        repeat_index(&self.n_edge, self.device())
    }

    /// Combine graphs into one disjoint batch.
    ///
    /// Features are stacked along the element axis and each graph's
    /// senders/receivers are offset by the number of nodes before it.
    /// A field must be present in all graphs or in none.
    pub fn batch(graphs: &[GraphsTuple]) -> Result<Self> {
        let first = graphs.first().ok_or(Error::EmptyBatch)?;
        let device = first.device().clone();

        let nodes = cat_optional("nodes", graphs.iter().map(|g| g.nodes()), 0)?;
        let edges = cat_optional("edges", graphs.iter().map(|g| g.edges()), 0)?;
        let globals = cat_optional("globals", graphs.iter().map(|g| g.globals()), 0)?;

        let total_edges: usize = graphs.iter().map(|g| g.num_edges()).sum();
        let mut senders = Vec::with_capacity(total_edges);
        let mut receivers = Vec::with_capacity(total_edges);
        let mut n_node = Vec::new();
        let mut n_edge = Vec::new();
        let mut offset = 0u32;

        for g in graphs {
            senders.extend(g.senders.to_vec1::<u32>()?.into_iter().map(|i| i + offset));
            receivers.extend(g.receivers.to_vec1::<u32>()?.into_iter().map(|i| i + offset));
            n_node.extend_from_slice(&g.n_node);
            n_edge.extend_from_slice(&g.n_edge);
            offset += g.num_nodes() as u32;
        }

        tracing::trace!(
            graphs = graphs.len(),
            nodes = offset,
            edges = total_edges,
            "batched graphs"
        );
        let senders = Tensor::from_vec(senders, total_edges, &device)?;
        let receivers = Tensor::from_vec(receivers, total_edges, &device)?;
        Self::from_parts(nodes, edges, senders, receivers, globals, n_node, n_edge)
    }
}

/// Concatenate the features of graphs sharing one structure.
///
/// `nodes`, `edges` and `globals` are concatenated along the feature axis;
/// connectivity is taken from the first graph. Every graph must have the
/// same node, edge and graph counts.
pub fn concat_features(graphs: &[&GraphsTuple]) -> Result<GraphsTuple> {
    let first = *graphs.first().ok_or(Error::EmptyBatch)?;
    for g in &graphs[1..] {
        if g.num_nodes() != first.num_nodes() {
            return Err(Error::ShapeMismatch {
                what: "node count",
                expected: first.num_nodes(),
                got: g.num_nodes(),
            });
        }
        if g.num_edges() != first.num_edges() {
            return Err(Error::ShapeMismatch {
                what: "edge count",
                expected: first.num_edges(),
                got: g.num_edges(),
            });
        }
        if g.num_graphs() != first.num_graphs() {
            return Err(Error::ShapeMismatch {
                what: "graph count",
                expected: first.num_graphs(),
                got: g.num_graphs(),
            });
        }
    }

    Ok(GraphsTuple {
        nodes: cat_optional("nodes", graphs.iter().map(|g| g.nodes()), D::Minus1)?,
        edges: cat_optional("edges", graphs.iter().map(|g| g.edges()), D::Minus1)?,
        globals: cat_optional("globals", graphs.iter().map(|g| g.globals()), D::Minus1)?,
        ..first.clone()
    })
}

fn cat_optional<'a, I, Dm>(what: &'static str, fields: I, dim: Dm) -> Result<Option<Tensor>>
where
    I: Iterator<Item = Option<&'a Tensor>>,
    Dm: candle_core::shape::Dim,
{
    let fields: Vec<Option<&Tensor>> = fields.collect();
    if fields.iter().all(Option::is_none) {
        return Ok(None);
    }
    let present: Vec<&Tensor> = fields
        .into_iter()
        .map(|f| f.ok_or(Error::MissingField(what)))
        .collect::<Result<_>>()?;
    Ok(Some(Tensor::cat(&present, dim)?))
}

fn check_rows(what: &'static str, t: Option<&Tensor>, expected: usize) -> Result<()> {
    if let Some(t) = t {
        let got = t.dim(0)?;
        if got != expected {
            return Err(Error::ShapeMismatch {
                what,
                expected,
                got,
            });
        }
    }
    Ok(())
}

fn repeat_index(counts: &[usize], device: &Device) -> Result<Tensor> {
    let index: Vec<u32> = counts
        .iter()
        .enumerate()
        .flat_map(|(i, &c)| std::iter::repeat(i as u32).take(c))
        .collect();
    let len = index.len();
    Ok(Tensor::from_vec(index, len, device)?)
}
