/*! Interprocedural dependence graphs.
 *
 * For one call-graph subgraph, every member procedure's lightweight dependence graph is
 * wrapped into a shared edge space, call sites are stitched to their callees, and the whole
 * thing is pruned down to the union of bounded bidirectional slices anchored at sensitive
 * call sites. Per-procedure graphs are built at most once and failures are cached too, so a
 * degenerate procedure is skipped everywhere it is referenced.
 */

use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::callgraph::CallGraph;
use crate::catalog::ApiCatalog;
use crate::graph::{EdgeKind, StmtEdge, StmtGraph};
use crate::ir::{ProcId, Program, StmtId};

use super::cache::{AnalysisCache, CacheStatistics};
use super::pdg::build_light_pdg;
use super::slice::{Direction, SliceSession};

/// Depth bound sentinel: traversals never cut off.
pub const UNBOUNDED_DEPTH: u32 = u32::MAX;

/// One interprocedural edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IpdgEdge {
    /// Intraprocedural dependence edge carried over unchanged.
    Normal(StmtEdge),
    /// Call site to the callee's boundary node.
    Call {
        source: StmtId,
        target: StmtId,
        callee: ProcId,
    },
    /// Callee boundary back to one return site, with the returned variables and escaping
    /// exception types aggregated off the callee exit's in-edges.
    Return {
        source: StmtId,
        target: StmtId,
        call_site: StmtId,
        vars: BTreeSet<String>,
        exceptions: BTreeSet<String>,
    },
    /// Recognized for labeling; no construction path produces it.
    CallToReturn { source: StmtId, target: StmtId },
}

impl IpdgEdge {
    pub fn source(&self) -> StmtId {
        match self {
            IpdgEdge::Normal(edge) => edge.source,
            IpdgEdge::Call { source, .. } => *source,
            IpdgEdge::Return { source, .. } => *source,
            IpdgEdge::CallToReturn { source, .. } => *source,
        }
    }

    pub fn target(&self) -> StmtId {
        match self {
            IpdgEdge::Normal(edge) => edge.target,
            IpdgEdge::Call { target, .. } => *target,
            IpdgEdge::Return { target, .. } => *target,
            IpdgEdge::CallToReturn { target, .. } => *target,
        }
    }
}

/// Interprocedural dependence graph pruned to the union of catalog-anchored slices.
///
/// Nodes are the statements the slicing traversals saw; a node enqueued in the final round
/// but never expanded is retained. Edge maps hold the slice, not the full stitched graph.
#[derive(Debug)]
pub struct SlicedIpdg<'p> {
    program: &'p Program,
    in_edges: IndexMap<StmtId, Vec<IpdgEdge>>,
    out_edges: IndexMap<StmtId, Vec<IpdgEdge>>,
    owner: IndexMap<StmtId, ProcId>,
    pdgs: AnalysisCache<Option<StmtGraph>>,
}

impl<'p> SlicedIpdg<'p> {
    /// Stitch the subgraph's procedures together, then prune to the union of bounded
    /// bidirectional slices from every sensitive call site. `depth` counts traversal
    /// rounds per closure; [`UNBOUNDED_DEPTH`] disables the cutoff.
    pub fn build(
        program: &'p Program,
        graph: &CallGraph,
        catalog: &ApiCatalog,
        depth: u32,
    ) -> SlicedIpdg<'p> {
        let mut ipdg = SlicedIpdg {
            program,
            in_edges: IndexMap::new(),
            out_edges: IndexMap::new(),
            owner: IndexMap::new(),
            pdgs: AnalysisCache::new(),
        };
        ipdg.stitch(graph);
        ipdg.slice_and_prune(catalog, depth, graph.name());
        ipdg
    }

    fn stitch(&mut self, graph: &CallGraph) {
        for proc in graph.members() {
            if !self.ensure_pdg(proc) {
                continue;
            }
            let nodes: Vec<StmtId> = match self.pdg_of(proc) {
                Some(pdg) => pdg.nodes().collect(),
                None => continue,
            };
            for node in nodes {
                self.owner.insert(node, proc);
                let out: Vec<StmtEdge> = self
                    .pdg_of(proc)
                    .map(|pdg| pdg.out_edges_of(node).to_vec())
                    .unwrap_or_default();
                for edge in out {
                    let target = edge.target;
                    let wrapped = IpdgEdge::Normal(edge);
                    self.out_edges.entry(node).or_default().push(wrapped.clone());
                    self.in_edges.entry(target).or_default().push(wrapped);
                }
                if self.program.stmt(node).is_invoke() {
                    self.stitch_call(graph, proc, node);
                }
            }
        }
    }

    /// CALL edge from the call site to the callee's boundary node, then one RETURN edge per
    /// return site. Return sites are the call site's successors in its owning dependence
    /// graph; returned variables and escaping exceptions aggregate off the callee exit's
    /// in-edges.
    fn stitch_call(&mut self, graph: &CallGraph, owner: ProcId, call_site: StmtId) {
        for &callee in graph.callees_of(call_site) {
            if !self.ensure_pdg(callee) {
                debug!(call = %call_site, "callee dependence graph unavailable, call edge dropped");
                continue;
            }
            let Some(callee_pdg) = self.pdg_of(callee) else {
                continue;
            };
            let Some(boundary) = callee_pdg.exit() else {
                continue;
            };
            let mut vars = BTreeSet::new();
            let mut exceptions = BTreeSet::new();
            for edge in callee_pdg.in_edges_of(boundary) {
                if edge.kind == EdgeKind::Return {
                    if let Some(var) = self.program.stmt(edge.source).returned_var() {
                        vars.insert(var.to_string());
                    }
                }
                if edge.is_exceptional() {
                    exceptions.extend(edge.exceptions.iter().cloned());
                }
            }
            let return_sites: Vec<StmtId> = self
                .pdg_of(owner)
                .map(|pdg| pdg.succs_of(call_site).collect())
                .unwrap_or_default();

            let call = IpdgEdge::Call {
                source: call_site,
                target: boundary,
                callee,
            };
            self.out_edges
                .entry(call_site)
                .or_default()
                .push(call.clone());
            self.in_edges.entry(boundary).or_default().push(call);
            for site in return_sites {
                let ret = IpdgEdge::Return {
                    source: boundary,
                    target: site,
                    call_site,
                    vars: vars.clone(),
                    exceptions: exceptions.clone(),
                };
                self.out_edges.entry(boundary).or_default().push(ret.clone());
                self.in_edges.entry(site).or_default().push(ret);
            }
        }
    }

    /// Build the procedure's lightweight dependence graph once, caching failure as well.
    /// Returns whether a graph is available.
    fn ensure_pdg(&mut self, proc: ProcId) -> bool {
        if let Some(slot) = self.pdgs.get(proc) {
            return slot.is_some();
        }
        let built = match build_light_pdg(self.program, proc) {
            Ok(pdg) => Some(pdg),
            Err(err) => {
                warn!(
                    procedure = %self.program.proc(proc).sig,
                    %err,
                    "dependence graph unavailable, procedure skipped"
                );
                None
            }
        };
        self.pdgs.insert(proc, built).is_some()
    }

    fn slice_and_prune(&mut self, catalog: &ApiCatalog, depth: u32, name: &str) {
        let anchors: Vec<StmtId> = self
            .owner
            .keys()
            .copied()
            .filter(|&s| catalog.match_stmt(self.program.stmt(s)).is_some())
            .collect();
        if anchors.is_empty() {
            info!(subgraph = name, "no sensitive call site, slice is empty");
        }
        let mut session = SliceSession::new();
        let mut slice_in: IndexMap<StmtId, Vec<IpdgEdge>> = IndexMap::new();
        let mut slice_out: IndexMap<StmtId, Vec<IpdgEdge>> = IndexMap::new();
        for &anchor in &anchors {
            debug!(anchor = %anchor, "bounded slice from sensitive call site");
            self.bounded_sweep(
                anchor,
                Direction::Forward,
                depth,
                &mut session,
                &mut slice_in,
                &mut slice_out,
            );
            self.bounded_sweep(
                anchor,
                Direction::Backward,
                depth,
                &mut session,
                &mut slice_in,
                &mut slice_out,
            );
        }
        self.in_edges = slice_in;
        self.out_edges = slice_out;
        self.owner.retain(|stmt, _| session.seen(*stmt));
    }

    /// One bounded breadth-first closure from `begin`. The hop counter advances once per
    /// traversal round, not per dequeued node, so `depth` bounds the distance from the
    /// anchor in whole frontiers.
    fn bounded_sweep(
        &self,
        begin: StmtId,
        direction: Direction,
        depth: u32,
        session: &mut SliceSession,
        slice_in: &mut IndexMap<StmtId, Vec<IpdgEdge>>,
        slice_out: &mut IndexMap<StmtId, Vec<IpdgEdge>>,
    ) {
        let mut queue = VecDeque::new();
        queue.push_back(begin);
        session.enqueue(begin);
        let mut rounds = 0u32;
        while !queue.is_empty() && rounds <= depth {
            for _ in 0..queue.len() {
                let Some(curr) = queue.pop_front() else { break };
                session.settle(curr);
                let edges = match direction {
                    Direction::Forward => self.out_edges_of(curr),
                    Direction::Backward => self.in_edges_of(curr),
                };
                for edge in edges {
                    record_slice_edge(slice_in, slice_out, edge);
                    let neighbor = match direction {
                        Direction::Forward => edge.target(),
                        Direction::Backward => edge.source(),
                    };
                    if !session.seen(neighbor) {
                        session.enqueue(neighbor);
                        queue.push_back(neighbor);
                    }
                }
            }
            if depth != UNBOUNDED_DEPTH {
                rounds += 1;
            }
        }
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    pub fn nodes(&self) -> impl Iterator<Item = StmtId> + '_ {
        self.owner.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.owner.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(Vec::len).sum()
    }

    pub fn in_edges_of(&self, stmt: StmtId) -> &[IpdgEdge] {
        self.in_edges
            .get(&stmt)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn out_edges_of(&self, stmt: StmtId) -> &[IpdgEdge] {
        self.out_edges
            .get(&stmt)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn preds_of(&self, stmt: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.in_edges_of(stmt).iter().map(|e| e.source())
    }

    pub fn succs_of(&self, stmt: StmtId) -> impl Iterator<Item = StmtId> + '_ {
        self.out_edges_of(stmt).iter().map(|e| e.target())
    }

    pub fn has_edge(&self, edge: &IpdgEdge) -> bool {
        self.out_edges
            .get(&edge.source())
            .map(|v| v.contains(edge))
            .unwrap_or(false)
    }

    pub fn is_call_site(&self, stmt: StmtId) -> bool {
        self.program.stmt(stmt).is_invoke()
    }

    /// Return sites of a call, read off the owning dependence graph's successors.
    pub fn return_sites_of(&self, call_site: StmtId) -> Vec<StmtId> {
        self.owner
            .get(&call_site)
            .and_then(|proc| self.pdg_of(*proc))
            .map(|pdg| pdg.succs_of(call_site).collect())
            .unwrap_or_default()
    }

    pub fn containing_proc_of(&self, stmt: StmtId) -> Option<ProcId> {
        self.owner.get(&stmt).copied()
    }

    /// Both boundary lookups resolve to the dependence graph's exit node.
    pub fn entry_of(&self, proc: ProcId) -> Option<StmtId> {
        self.pdg_of(proc).and_then(|pdg| pdg.exit())
    }

    pub fn exit_of(&self, proc: ProcId) -> Option<StmtId> {
        self.pdg_of(proc).and_then(|pdg| pdg.exit())
    }

    /// The memoized lightweight dependence graph of a member procedure, when it built.
    pub fn pdg_of(&self, proc: ProcId) -> Option<&StmtGraph> {
        self.pdgs.peek(proc).and_then(|slot| slot.as_ref())
    }

    /// Hit/miss accounting of the per-procedure graph cache.
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.pdgs.statistics()
    }
}

/// Record one edge into the slice maps unless either side already holds it.
fn record_slice_edge(
    slice_in: &mut IndexMap<StmtId, Vec<IpdgEdge>>,
    slice_out: &mut IndexMap<StmtId, Vec<IpdgEdge>>,
    edge: &IpdgEdge,
) {
    let source = edge.source();
    let target = edge.target();
    let in_out = slice_out
        .get(&source)
        .map(|v| v.contains(edge))
        .unwrap_or(false);
    let in_in = slice_in
        .get(&target)
        .map(|v| v.contains(edge))
        .unwrap_or(false);
    if !in_out && !in_in {
        slice_out.entry(source).or_default().push(edge.clone());
        slice_in.entry(target).or_default().push(edge.clone());
    }
}
