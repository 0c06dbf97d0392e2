use pretty_assertions::assert_eq;

use super::{build_proc, diamond_proc, invoke, sensitive_catalog, At, SENSITIVE_API};
use crate::analysis::{build_full_pdg, build_light_pdg, slice_pdg};
use crate::catalog::ApiCatalog;
use crate::graph::{EdgeKind, StmtEdge};
use crate::ir::Program;

#[test]
fn diamond_slice_from_the_sensitive_call() {
    let mut program = Program::new();
    let proc = diamond_proc(&mut program);
    let pdg = build_full_pdg(&mut program, proc).unwrap();
    let slice = slice_pdg(&program, &pdg, &sensitive_catalog());

    let stmts = super::body(&program, proc);
    let cfg = &program.proc(proc).cfg;

    // Backward closure pulls in the branch; forward closure reaches the join and the
    // procedure exit.
    assert!(slice.has_node(stmts[1]), "anchor itself");
    assert!(slice.has_node(stmts[0]), "controlling branch");
    assert!(slice.has_node(stmts[3]), "join, forward-reachable");
    assert!(slice.has_node(pdg.exit().unwrap()));
    assert!(!slice.has_node(cfg.entry().unwrap()));
    assert!(!slice.has_node(cfg.exit().unwrap()));
    assert!(!slice.has_node(pdg.entry().unwrap()));

    assert!(slice.has_edge(&StmtEdge::new(EdgeKind::ControlDep, stmts[0], stmts[1])));
    assert!(slice.has_edge(&StmtEdge::new(EdgeKind::DataDep, stmts[2], stmts[3])));
    assert!(slice.has_edge(&StmtEdge::new(
        EdgeKind::Return,
        stmts[3],
        pdg.exit().unwrap()
    )));
    assert_eq!(slice.node_count(), 5);
    assert_eq!(slice.edge_count(), 6);
}

#[test]
fn no_sensitive_call_yields_an_empty_slice() {
    let mut program = Program::new();
    let proc = diamond_proc(&mut program);
    let pdg = build_full_pdg(&mut program, proc).unwrap();
    let slice = slice_pdg(&program, &pdg, &ApiCatalog::default());
    assert_eq!(slice.node_count(), 0);
    assert_eq!(slice.edge_count(), 0);
}

#[test]
fn overlapping_anchors_accumulate_into_one_slice() {
    let mut program = Program::new();
    let proc = build_proc(
        &mut program,
        "twocalls",
        vec![invoke(SENSITIVE_API), invoke(SENSITIVE_API)],
        &[
            (At::Entry, At::Stmt(0)),
            (At::Stmt(0), At::Stmt(1)),
            (At::Stmt(1), At::Exit),
        ],
        &[],
        &[(0, 1)],
    );
    let pdg = build_light_pdg(&program, proc).unwrap();
    let slice = slice_pdg(&program, &pdg, &sensitive_catalog());

    let stmts = super::body(&program, proc);
    let entry = pdg.entry().unwrap();
    assert!(slice.has_node(stmts[0]));
    assert!(slice.has_node(stmts[1]));
    assert!(slice.has_node(entry));
    assert_eq!(slice.node_count(), 3);

    assert!(slice.has_edge(&StmtEdge::new(EdgeKind::DataDep, stmts[0], stmts[1])));
    assert!(slice.has_edge(&StmtEdge::new(EdgeKind::ControlDep, entry, stmts[0])));
    assert!(slice.has_edge(&StmtEdge::new(EdgeKind::ControlDep, entry, stmts[1])));
    assert_eq!(slice.edge_count(), 3);
}

#[test]
fn disconnected_statements_stay_out_of_the_slice() {
    let mut program = Program::new();
    // s1 is flow-adjacent but has no dependence path to or from the call in s0.
    let proc = build_proc(
        &mut program,
        "isolated",
        vec![invoke(SENSITIVE_API), crate::ir::StmtKind::Ordinary],
        &[
            (At::Entry, At::Stmt(0)),
            (At::Stmt(0), At::Stmt(1)),
            (At::Stmt(1), At::Exit),
        ],
        &[],
        &[],
    );
    let pdg = build_light_pdg(&program, proc).unwrap();
    let slice = slice_pdg(&program, &pdg, &sensitive_catalog());
    let stmts = super::body(&program, proc);
    assert!(slice.has_node(stmts[0]));
    // s1 only shares the entry's control row with the anchor; it is not reachable from
    // the anchor itself.
    assert!(!slice.has_node(stmts[1]));
}
