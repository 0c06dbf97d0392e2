/*! Catalog-anchored slicing over one procedure's dependence graph.
 *
 * Every sensitive call site in the graph anchors a forward and a backward breadth-first
 * closure. All closures of a run share one visit session, so regions reachable from several
 * anchors are walked once and the result accumulates into a single slice graph.
 */

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::debug;

use crate::catalog::ApiCatalog;
use crate::graph::StmtGraph;
use crate::ir::{Program, StmtId};

/// Traversal direction of one closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Visit state of a node within a slicing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitState {
    /// Queued but not yet expanded.
    Enqueued,
    /// Dequeued and expanded.
    Settled,
}

/// Visit bookkeeping for one slicing run, shared across every anchor and direction of
/// the run.
#[derive(Debug, Default)]
pub struct SliceSession {
    state: IndexMap<StmtId, VisitState>,
}

impl SliceSession {
    pub fn new() -> SliceSession {
        SliceSession {
            state: IndexMap::new(),
        }
    }

    /// Whether the node was enqueued at any point, settled or not.
    pub fn seen(&self, stmt: StmtId) -> bool {
        self.state.contains_key(&stmt)
    }

    pub fn is_settled(&self, stmt: StmtId) -> bool {
        self.state.get(&stmt) == Some(&VisitState::Settled)
    }

    pub fn seen_count(&self) -> usize {
        self.state.len()
    }

    pub(crate) fn enqueue(&mut self, stmt: StmtId) {
        self.state.insert(stmt, VisitState::Enqueued);
    }

    pub(crate) fn settle(&mut self, stmt: StmtId) {
        self.state.insert(stmt, VisitState::Settled);
    }
}

/// Union of the bidirectional closures of every sensitive call site in `pdg`.
///
/// Anchors are found by scanning the graph's nodes in order; a procedure without any
/// sensitive call site yields an empty slice.
pub fn slice_pdg(program: &Program, pdg: &StmtGraph, catalog: &ApiCatalog) -> StmtGraph {
    let mut session = SliceSession::new();
    let mut slice = StmtGraph::new(pdg.proc());
    for node in pdg.nodes() {
        if catalog.match_stmt(program.stmt(node)).is_none() {
            continue;
        }
        debug!(anchor = %node, "slicing from sensitive call site");
        sweep(pdg, node, Direction::Forward, &mut session, &mut slice);
        sweep(pdg, node, Direction::Backward, &mut session, &mut slice);
    }
    slice
}

/// One breadth-first closure from `begin`.
///
/// The begin node re-enters the queue even when an earlier closure settled it; every other
/// node enqueues at most once per session. Nodes join the slice when dequeued, edges join
/// with their original orientation and kind when first crossed.
fn sweep(
    pdg: &StmtGraph,
    begin: StmtId,
    direction: Direction,
    session: &mut SliceSession,
    slice: &mut StmtGraph,
) {
    let mut queue = VecDeque::new();
    queue.push_back(begin);
    session.enqueue(begin);
    while let Some(curr) = queue.pop_front() {
        session.settle(curr);
        slice.add_node(curr);
        let edges = match direction {
            Direction::Forward => pdg.out_edges_of(curr),
            Direction::Backward => pdg.in_edges_of(curr),
        };
        for edge in edges {
            if !slice.has_edge(edge) {
                slice.add_edge(edge.clone());
            }
            let neighbor = match direction {
                Direction::Forward => edge.target,
                Direction::Backward => edge.source,
            };
            if !session.seen(neighbor) {
                session.enqueue(neighbor);
                queue.push_back(neighbor);
            }
        }
    }
}
