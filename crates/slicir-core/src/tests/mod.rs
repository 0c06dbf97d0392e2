/*! Test coverage for the dependence analyses.
 *
 * The analysis chain is sensitive to node order and index conventions, so these tests work
 * from small hand-built procedures with known flow shapes and check graph content exactly:
 * postdominator chains, dependence rows, slice membership, and call/return stitching.
 */

mod slice_tests;

use indexmap::IndexMap;

use crate::graph::{EdgeKind, StmtEdge, StmtGraph};
use crate::ir::{CallExpr, ProcId, Program, StmtId, StmtKind};
use crate::sig::Signature;

/// Endpoint of a flow-edge description: the entry, a body statement by index, or the exit.
#[derive(Clone, Copy)]
pub(crate) enum At {
    Entry,
    Stmt(usize),
    Exit,
}

/// Assemble one procedure from body statement kinds, flow edges over
/// `[entry, body..., exit]`, exceptional edges with their thrown type, and def-use
/// pairs given as body indices.
pub(crate) fn build_proc(
    program: &mut Program,
    name: &str,
    kinds: Vec<StmtKind>,
    flow: &[(At, At)],
    throws: &[(At, At, &str)],
    defuse: &[(usize, usize)],
) -> ProcId {
    let sig = Signature::new("com.app.Main", name, Vec::new());
    let proc = program.declare_proc(sig).unwrap();
    let entry = program.alloc_stmt(proc, None, StmtKind::Entry, "entry");
    let mut body = Vec::new();
    for (i, kind) in kinds.into_iter().enumerate() {
        body.push(program.alloc_stmt(proc, Some(i as u32), kind, format!("s{i}")));
    }
    let exit = program.alloc_stmt(proc, None, StmtKind::Exit, "exit");

    let mut cfg = StmtGraph::new(proc);
    cfg.set_entry(entry);
    for &stmt in &body {
        cfg.add_node(stmt);
    }
    cfg.set_exit(exit);
    let resolve = |at: At| match at {
        At::Entry => entry,
        At::Stmt(i) => body[i],
        At::Exit => exit,
    };
    for &(source, target) in flow {
        cfg.add_edge(StmtEdge::new(
            EdgeKind::FallThrough,
            resolve(source),
            resolve(target),
        ));
    }
    for &(source, target, exception) in throws {
        cfg.add_edge(StmtEdge::exceptional(
            resolve(source),
            resolve(target),
            vec![exception.to_string()],
        ));
    }

    let mut uses: IndexMap<StmtId, Vec<StmtId>> = IndexMap::new();
    for &(def, user) in defuse {
        uses.entry(body[def]).or_default().push(body[user]);
    }
    program.define_body(proc, body, cfg, uses);
    proc
}

pub(crate) fn invoke(target: &str) -> StmtKind {
    StmtKind::Invoke(CallExpr::Direct {
        target: Signature::parse(target).unwrap(),
    })
}

pub(crate) fn ret(var: Option<&str>) -> StmtKind {
    StmtKind::Return(var.map(str::to_string))
}

pub(crate) fn body(program: &Program, proc: ProcId) -> Vec<StmtId> {
    program.proc(proc).body.clone()
}

pub(crate) const SENSITIVE_API: &str = "<java.sql.Statement: executeQuery(java.lang.String)>";

pub(crate) fn sensitive_catalog() -> crate::catalog::ApiCatalog {
    let json = format!(
        r#"[{{
            "categoryName": "Database",
            "fine-grainedType": [{{
                "subcategoryName": "SQL execution",
                "short": "sql",
                "apiNames": ["{SENSITIVE_API}"]
            }}]
        }}]"#
    );
    crate::catalog::ApiCatalog::from_json(&json).unwrap()
}

/// The classic diamond: `entry -> s0 -> {s1, s2} -> s3 -> exit`, with a sensitive call in
/// the then-arm and both arms feeding the join.
pub(crate) fn diamond_proc(program: &mut Program) -> ProcId {
    build_proc(
        program,
        "diamond",
        vec![
            StmtKind::Ordinary,
            invoke(SENSITIVE_API),
            StmtKind::Ordinary,
            ret(Some("y")),
        ],
        &[
            (At::Entry, At::Stmt(0)),
            (At::Stmt(0), At::Stmt(1)),
            (At::Stmt(0), At::Stmt(2)),
            (At::Stmt(1), At::Stmt(3)),
            (At::Stmt(2), At::Stmt(3)),
            (At::Stmt(3), At::Exit),
        ],
        &[],
        &[(1, 3), (2, 3)],
    )
}
