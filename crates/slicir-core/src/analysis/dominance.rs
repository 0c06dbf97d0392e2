/*! Postdominance and control dependence.
 *
 * Control dependence is computed the classic way: build the reverse CFG, run the
 * Lengauer-Tarjan semidominator algorithm to get immediate postdominators, then walk
 * postdominance frontiers from every branch-like node. The calculator works on 1-based
 * algorithm indices (CFG position + 1) with index 0 reserved as the unvisited sentinel,
 * and the depth-first numbering starts at the exit.
 */

use crate::graph::StmtGraph;
use crate::{PdgError, Result};

/// Control-dependence rows over one CFG, keyed by the controlling node.
///
/// Row `x` lists the 1-based algorithm indices of the nodes control-dependent on `x`; row 0 is
/// reserved and always empty. The immediate-postdominator array is kept for inspection, the rest
/// of a calculator run is discarded.
#[derive(Debug, Clone)]
pub struct ControlDependence {
    node_count: usize,
    ipostdom: Vec<usize>,
    rows: Vec<Vec<usize>>,
}

impl ControlDependence {
    /// Run the full calculation for `cfg`. Degenerate control flow fails instead of looping
    /// or indexing out of range.
    pub fn compute(cfg: &StmtGraph) -> Result<ControlDependence> {
        Calculator::new(cfg)?.run()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Nodes control-dependent on `x` (1-based algorithm index).
    pub fn row(&self, x: usize) -> &[usize] {
        self.rows.get(x).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Immediate postdominator of `x` (1-based algorithm index). Unreached nodes default
    /// to the exit.
    pub fn ipostdom(&self, x: usize) -> usize {
        self.ipostdom.get(x).copied().unwrap_or(0)
    }
}

/// Working state for one run.
///
/// `radj` is the reverse graph the depth-first search runs over; `fadj` keeps the original
/// direction, which makes it the predecessor relation of the reverse graph. Arrays are sized
/// `n + 1` and slot 0 never holds a node.
struct Calculator {
    n: usize,
    count: usize,
    radj: Vec<Vec<usize>>,
    fadj: Vec<Vec<usize>>,
    dfn: Vec<usize>,
    order: Vec<usize>,
    parent: Vec<usize>,
    sdom: Vec<usize>,
    idom: Vec<usize>,
    buckets: Vec<Vec<usize>>,
}

impl Calculator {
    fn new(cfg: &StmtGraph) -> Result<Calculator> {
        let n = cfg.node_count();
        if n < 2 {
            return Err(PdgError::DegenerateFlow(format!(
                "flow graph with {n} nodes has no entry/exit pair"
            )));
        }
        let mut radj = vec![Vec::new(); n + 1];
        let mut fadj = vec![Vec::new(); n + 1];
        for node in cfg.nodes() {
            for edge in cfg.out_edges_of(node) {
                let src = cfg
                    .index_of(edge.source)
                    .ok_or(PdgError::UnknownStmt(edge.source))?;
                let dst = cfg
                    .index_of(edge.target)
                    .ok_or(PdgError::UnknownStmt(edge.target))?;
                radj[dst + 1].push(src + 1);
                fadj[src + 1].push(dst + 1);
            }
        }
        // Single-root the reverse graph with a synthetic entry -> exit edge.
        radj[n].push(1);
        fadj[1].push(n);
        Ok(Calculator {
            n,
            count: 0,
            radj,
            fadj,
            dfn: vec![0; n + 1],
            order: vec![0; n + 1],
            parent: vec![0; n + 1],
            sdom: (0..=n).collect(),
            idom: vec![0; n + 1],
            buckets: vec![Vec::new(); n + 1],
        })
    }

    fn run(mut self) -> Result<ControlDependence> {
        self.number_from_exit();
        self.compute_ipostdoms();
        // Unreached and unresolved nodes postdominate-default to the exit.
        for v in 1..=self.n {
            if self.idom[v] == 0 {
                self.idom[v] = self.n;
            }
        }
        let frontier = self.postdominance_frontier()?;
        let mut rows = vec![Vec::new(); self.n + 1];
        for y in 1..=self.n {
            for &x in &frontier[y] {
                rows[x].push(y);
            }
        }
        Ok(ControlDependence {
            node_count: self.n,
            ipostdom: self.idom,
            rows,
        })
    }

    /// Depth-first numbering of the reverse graph, rooted at the exit. Nodes the search never
    /// reaches keep `dfn` 0 and stay out of `order`.
    fn number_from_exit(&mut self) {
        let mut stack = vec![self.n];
        while let Some(v) = stack.pop() {
            if self.dfn[v] != 0 {
                continue;
            }
            self.count += 1;
            self.dfn[v] = self.count;
            self.order[self.count] = v;
            for &w in &self.radj[v] {
                if self.dfn[w] == 0 {
                    // The topmost push wins; it is the one popped first.
                    self.parent[w] = v;
                    stack.push(w);
                }
            }
        }
    }

    /// Semidominator pass over decreasing depth-first numbers, buckets resolved at the
    /// semidominator before the owning node links into the forest, then the final
    /// increasing-order resolution.
    fn compute_ipostdoms(&mut self) {
        let mut forest = LinkEval::new(self.n);
        for i in (2..=self.count).rev() {
            let v = self.order[i];
            for k in 0..self.fadj[v].len() {
                let u = self.fadj[v][k];
                // dfn[u] < i also captures unreached predecessors: their sentinel number 0
                // is minimal and wins the comparison below outright.
                let cand = if self.dfn[u] < i {
                    u
                } else {
                    self.sdom[forest.eval(u, &self.dfn, &self.sdom)]
                };
                if self.dfn[cand] < self.dfn[self.sdom[v]] {
                    self.sdom[v] = cand;
                }
            }
            let s = self.sdom[v];
            self.buckets[s].push(v);
            let bucket = std::mem::take(&mut self.buckets[v]);
            for x in bucket {
                self.idom[x] = forest.eval(x, &self.dfn, &self.sdom);
            }
            forest.link(v, self.parent[v]);
        }
        for i in 2..=self.count {
            let v = self.order[i];
            let u = self.idom[v];
            self.idom[v] = if self.sdom[u] == self.sdom[v] {
                self.sdom[v]
            } else {
                self.idom[u]
            };
        }
    }

    /// Postdominance frontiers via walks from each predecessor of every branch-like node up
    /// the ipostdom chain. A walk longer than the node count means the chain never reaches
    /// its bound.
    fn postdominance_frontier(&self) -> Result<Vec<Vec<usize>>> {
        let mut frontier: Vec<Vec<usize>> = vec![Vec::new(); self.n + 1];
        for x in 1..=self.n {
            if self.fadj[x].len() < 2 {
                continue;
            }
            for &p in &self.fadj[x] {
                let mut runner = p;
                let mut hops = 0usize;
                while runner != self.idom[x] {
                    if !frontier[runner].contains(&x) {
                        frontier[runner].push(x);
                    }
                    runner = self.idom[runner];
                    hops += 1;
                    if hops > self.n {
                        return Err(PdgError::DegenerateFlow(format!(
                            "postdominator chain from node {p} never reaches the bound of node {x}"
                        )));
                    }
                }
            }
        }
        Ok(frontier)
    }
}

/// Link-eval forest for the semidominator pass.
///
/// `eval` returns the node with the minimum `dfn[sdom[.]]` on the forest path from just below
/// the root down to the queried node, compressing every visited hop onto the root.
struct LinkEval {
    ancestor: Vec<usize>,
    label: Vec<usize>,
}

impl LinkEval {
    fn new(n: usize) -> LinkEval {
        LinkEval {
            ancestor: vec![0; n + 1],
            label: (0..=n).collect(),
        }
    }

    fn link(&mut self, v: usize, parent: usize) {
        self.ancestor[v] = parent;
    }

    fn eval(&mut self, v: usize, dfn: &[usize], sdom: &[usize]) -> usize {
        if self.ancestor[v] == 0 {
            return self.label[v];
        }
        let mut path = Vec::new();
        let mut root = v;
        while self.ancestor[root] != 0 {
            path.push(root);
            root = self.ancestor[root];
        }
        // Fold labels top-down so each node inherits the best label above it, excluding
        // the root itself.
        for &node in path.iter().rev() {
            let up = self.ancestor[node];
            if up != root && dfn[sdom[self.label[up]]] < dfn[sdom[self.label[node]]] {
                self.label[node] = self.label[up];
            }
            self.ancestor[node] = root;
        }
        self.label[v]
    }
}
