/*! Statement graphs.
 *
 * Control-flow graphs, dependence graphs, and slice results share one container and one edge
 * vocabulary. A dependence graph is the same structure as the flow graph it came from, just with
 * different edge kinds, which keeps the slicer and the emitters agnostic about which stage
 * produced the graph they walk.
 */

use indexmap::{IndexMap, IndexSet};

use crate::ir::{ProcId, StmtId};

/// Edge kinds over statement graphs. The flow kinds come in with the ingested CFG; the
/// dependence kinds are produced by the builders in [`crate::analysis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Sequential flow to the next statement.
    FallThrough,
    /// Unconditional jump.
    Goto,
    /// Switch dispatch for one case value.
    SwitchCase(i64),
    /// Abrupt completion; the edge carries the thrown exception types.
    Exceptional,
    /// Target executes only because the source's branch chose it.
    ControlDep,
    /// Source defines a value the target uses.
    DataDep,
    /// Source returns control to the procedure exit.
    Return,
}

impl EdgeKind {
    pub fn is_dependence(&self) -> bool {
        matches!(
            self,
            EdgeKind::ControlDep | EdgeKind::DataDep | EdgeKind::Return
        )
    }
}

/// One directed edge. `exceptions` is only populated on [`EdgeKind::Exceptional`] edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StmtEdge {
    pub kind: EdgeKind,
    pub source: StmtId,
    pub target: StmtId,
    pub exceptions: Vec<String>,
}

impl StmtEdge {
    pub fn new(kind: EdgeKind, source: StmtId, target: StmtId) -> StmtEdge {
        StmtEdge {
            kind,
            source,
            target,
            exceptions: Vec::new(),
        }
    }

    pub fn exceptional(source: StmtId, target: StmtId, exceptions: Vec<String>) -> StmtEdge {
        StmtEdge {
            kind: EdgeKind::Exceptional,
            source,
            target,
            exceptions,
        }
    }

    pub fn is_exceptional(&self) -> bool {
        self.kind == EdgeKind::Exceptional
    }
}

/// Directed multigraph over statements with a stable node order.
///
/// Node order is insertion order. For CFGs the convention is `[entry, body..., exit]`, and the
/// dominance calculator reads its index mapping straight off that order. `add_edge` never adds
/// nodes: slices rely on the node set staying exactly what the traversal settled.
#[derive(Debug, Clone)]
pub struct StmtGraph {
    proc: ProcId,
    entry: Option<StmtId>,
    exit: Option<StmtId>,
    nodes: IndexSet<StmtId>,
    in_edges: IndexMap<StmtId, Vec<StmtEdge>>,
    out_edges: IndexMap<StmtId, Vec<StmtEdge>>,
}

impl StmtGraph {
    pub fn new(proc: ProcId) -> StmtGraph {
        StmtGraph {
            proc,
            entry: None,
            exit: None,
            nodes: IndexSet::new(),
            in_edges: IndexMap::new(),
            out_edges: IndexMap::new(),
        }
    }

    pub fn proc(&self) -> ProcId {
        self.proc
    }

    pub fn set_entry(&mut self, stmt: StmtId) {
        self.nodes.insert(stmt);
        self.entry = Some(stmt);
    }

    pub fn set_exit(&mut self, stmt: StmtId) {
        self.nodes.insert(stmt);
        self.exit = Some(stmt);
    }

    pub fn entry(&self) -> Option<StmtId> {
        self.entry
    }

    pub fn exit(&self) -> Option<StmtId> {
        self.exit
    }

    pub fn is_entry(&self, stmt: StmtId) -> bool {
        self.entry == Some(stmt)
    }

    pub fn is_exit(&self, stmt: StmtId) -> bool {
        self.exit == Some(stmt)
    }

    /// Insert a node; returns false when it was already present.
    pub fn add_node(&mut self, stmt: StmtId) -> bool {
        self.nodes.insert(stmt)
    }

    pub fn has_node(&self, stmt: StmtId) -> bool {
        self.nodes.contains(&stmt)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.nodes.iter().copied()
    }

    /// Stable insertion-order position of a node.
    pub fn index_of(&self, stmt: StmtId) -> Option<usize> {
        self.nodes.get_index_of(&stmt)
    }

    pub fn node_at(&self, index: usize) -> Option<StmtId> {
        self.nodes.get_index(index).copied()
    }

    pub fn add_edge(&mut self, edge: StmtEdge) {
        self.out_edges
            .entry(edge.source)
            .or_default()
            .push(edge.clone());
        self.in_edges.entry(edge.target).or_default().push(edge);
    }

    pub fn has_edge(&self, edge: &StmtEdge) -> bool {
        self.out_edges
            .get(&edge.source)
            .map(|v| v.contains(edge))
            .unwrap_or(false)
    }

    pub fn in_edges_of(&self, stmt: StmtId) -> &[StmtEdge] {
        self.in_edges
            .get(&stmt)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn out_edges_of(&self, stmt: StmtId) -> &[StmtEdge] {
        self.out_edges
            .get(&stmt)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn preds_of(&self, stmt: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.in_edges_of(stmt).iter().map(|e| e.source)
    }

    pub fn succs_of(&self, stmt: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.out_edges_of(stmt).iter().map(|e| e.target)
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(Vec::len).sum()
    }
}
