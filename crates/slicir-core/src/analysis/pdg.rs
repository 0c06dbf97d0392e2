/*! Intraprocedural program dependence graphs.
 *
 * Two builder modes share the control-dependence calculator and the def-use pass. The full
 * mode allocates fresh synthetic entry/exit statements and is what the standalone graph dump
 * works from. The lightweight mode reuses the CFG's own boundary nodes and feeds the
 * interprocedural builder, which keys call stitching off those shared nodes.
 */

use crate::graph::{EdgeKind, StmtEdge, StmtGraph};
use crate::ir::{ProcId, Program, StmtKind};
use crate::{PdgError, Result};

use super::dominance::ControlDependence;

/// Full-graph mode: control dependence plus data dependence over fresh synthetic
/// entry/exit markers allocated in the program arena.
///
/// Control rows are read against plain CFG positions here; the resulting one-position
/// shift against the calculator's 1-based rows is part of the mode's contract, as is
/// routing row 0 out of the synthetic entry.
pub fn build_full_pdg(program: &mut Program, proc: ProcId) -> Result<StmtGraph> {
    let deps = ControlDependence::compute(&program.proc(proc).cfg)?;
    let entry = program.alloc_stmt(proc, None, StmtKind::Entry, "entry");
    let exit = program.alloc_stmt(proc, None, StmtKind::Exit, "exit");

    let mut pdg = StmtGraph::new(proc);
    pdg.set_entry(entry);
    pdg.set_exit(exit);

    let procedure = program.proc(proc);
    let cfg = &procedure.cfg;
    for u in 0..cfg.node_count() {
        let Some(source) = cfg.node_at(u) else { continue };
        pdg.add_node(source);
        for &v in deps.row(u) {
            let Some(target) = cfg.node_at(v) else { continue };
            let from = if u == 0 { entry } else { source };
            pdg.add_edge(StmtEdge::new(EdgeKind::ControlDep, from, target));
        }
    }

    for &stmt in &procedure.body {
        if program.stmt(stmt).is_return() {
            pdg.add_edge(StmtEdge::new(EdgeKind::Return, stmt, exit));
        }
    }
    add_data_edges(program, proc, &mut pdg);
    Ok(pdg)
}

/// Lightweight mode: same dependences, but over the CFG's own entry/exit nodes and with
/// rows read 1-based, so row 1 belongs to the entry.
///
/// Exit-bound flow is materialized as well: every return statement gets its RETURN edge
/// into the exit and exceptional CFG edges into the exit are carried over, so call
/// stitching can read returned values and escaping exceptions off the exit's in-edges.
pub fn build_light_pdg(program: &Program, proc: ProcId) -> Result<StmtGraph> {
    let procedure = program.proc(proc);
    let cfg = &procedure.cfg;
    let deps = ControlDependence::compute(cfg)?;
    let (entry, exit) = match (cfg.entry(), cfg.exit()) {
        (Some(entry), Some(exit)) => (entry, exit),
        _ => return Err(PdgError::MissingBoundary("entry or exit")),
    };

    let mut pdg = StmtGraph::new(proc);
    for node in cfg.nodes() {
        pdg.add_node(node);
    }
    pdg.set_entry(entry);
    pdg.set_exit(exit);

    for u in 1..=cfg.node_count() {
        let Some(source) = cfg.node_at(u - 1) else { continue };
        let kind = if program.stmt(source).is_return() {
            EdgeKind::Return
        } else {
            EdgeKind::ControlDep
        };
        for &v in deps.row(u) {
            let Some(target) = cfg.node_at(v - 1) else { continue };
            pdg.add_edge(StmtEdge::new(kind, source, target));
        }
    }

    for edge in cfg.in_edges_of(exit) {
        if edge.is_exceptional() {
            pdg.add_edge(StmtEdge::exceptional(
                edge.source,
                exit,
                edge.exceptions.clone(),
            ));
        }
    }
    for &stmt in &procedure.body {
        if program.stmt(stmt).is_return() {
            pdg.add_edge(StmtEdge::new(EdgeKind::Return, stmt, exit));
        }
    }
    add_data_edges(program, proc, &mut pdg);
    Ok(pdg)
}

/// One DATA edge per (definition, use) pair. Both modes pre-add every node the pairs can
/// touch, so this only pushes edges.
fn add_data_edges(program: &Program, proc: ProcId, pdg: &mut StmtGraph) {
    let procedure = program.proc(proc);
    for &def in &procedure.body {
        for &user in procedure.uses_of(def) {
            pdg.add_edge(StmtEdge::new(EdgeKind::DataDep, def, user));
        }
    }
}
