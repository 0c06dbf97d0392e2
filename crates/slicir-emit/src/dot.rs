/*! Graphviz dumps of dependence graphs.
 *
 * Dumps keep the visual language downstream feature extraction already reads: boxed filled
 * nodes labeled with statement kind, catalog short code, and body index, edges labeled by
 * kind. Interprocedural dumps style call and return edges dashed so stitch points stand out.
 */

use std::collections::HashMap;
use std::io::Write;

use slicir_core::analysis::{IpdgEdge, SlicedIpdg};
use slicir_core::catalog::ApiCatalog;
use slicir_core::graph::{EdgeKind, StmtEdge, StmtGraph};
use slicir_core::ir::{Program, StmtId, StmtKind};
use slicir_core::sig::Signature;

use crate::emitter::{EmitContext, EmitHelper, EmitResult, Emitter};

const FILENAME_LIMIT: usize = 200;
const NODE_ATTRIBUTES: &str = r#"node [shape=box,style=filled,color=".3 .2 1.0"];"#;

/// Dumps one statement graph (flow graph, dependence graph, or slice) as a digraph.
pub struct PdgDotEmitter<'a> {
    program: &'a Program,
    catalog: &'a ApiCatalog,
}

impl<'a> PdgDotEmitter<'a> {
    pub fn new(program: &'a Program, catalog: &'a ApiCatalog) -> PdgDotEmitter<'a> {
        PdgDotEmitter { program, catalog }
    }
}

impl Emitter for PdgDotEmitter<'_> {
    type Item = StmtGraph;

    fn emit<W: Write>(
        &self,
        graph: &StmtGraph,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        EmitHelper::write_block(writer, context, "digraph G", |w, c| {
            EmitHelper::write_line(w, c, NODE_ATTRIBUTES)?;
            for node in graph.nodes() {
                let Some(index) = graph.index_of(node) else {
                    continue;
                };
                let label = node_label(self.program, self.catalog, node);
                EmitHelper::write_line(w, c, &format!(r#""{}" [label="{}"];"#, index, label))?;
            }
            for node in graph.nodes() {
                for edge in graph.out_edges_of(node) {
                    let (Some(source), Some(target)) =
                        (graph.index_of(edge.source), graph.index_of(edge.target))
                    else {
                        continue;
                    };
                    let attrs = if edge.is_exceptional() { ",color=red" } else { "" };
                    EmitHelper::write_line(
                        w,
                        c,
                        &format!(
                            r#""{}" -> "{}" [label="{}"{}];"#,
                            source,
                            target,
                            flow_edge_label(edge),
                            attrs
                        ),
                    )?;
                }
            }
            Ok(())
        })
    }
}

/// Dumps a sliced interprocedural graph. Normal edges keep their kind label; call and
/// return edges get the dashed styling.
pub struct IpdgDotEmitter<'a> {
    catalog: &'a ApiCatalog,
}

impl<'a> IpdgDotEmitter<'a> {
    pub fn new(catalog: &'a ApiCatalog) -> IpdgDotEmitter<'a> {
        IpdgDotEmitter { catalog }
    }
}

impl<'a> Emitter for IpdgDotEmitter<'a> {
    type Item = SlicedIpdg<'a>;

    fn emit<W: Write>(
        &self,
        graph: &SlicedIpdg<'a>,
        writer: &mut W,
        context: &mut EmitContext,
    ) -> EmitResult {
        let indices: HashMap<StmtId, usize> =
            graph.nodes().enumerate().map(|(i, n)| (n, i)).collect();
        EmitHelper::write_block(writer, context, "digraph G", |w, c| {
            EmitHelper::write_line(w, c, NODE_ATTRIBUTES)?;
            for node in graph.nodes() {
                let label = node_label(graph.program(), self.catalog, node);
                EmitHelper::write_line(
                    w,
                    c,
                    &format!(r#""{}" [label="{}"];"#, indices[&node], label),
                )?;
            }
            for node in graph.nodes() {
                for edge in graph.out_edges_of(node) {
                    let (Some(&source), Some(&target)) =
                        (indices.get(&edge.source()), indices.get(&edge.target()))
                    else {
                        continue;
                    };
                    let (label, attrs) = ipdg_edge_style(edge);
                    EmitHelper::write_line(
                        w,
                        c,
                        &format!(r#""{}" -> "{}" [label="{}"{}];"#, source, target, label, attrs),
                    )?;
                }
            }
            Ok(())
        })
    }
}

/// Boundary nodes surface the owning signature; body nodes carry kind, catalog short code
/// (`no` when not sensitive), and body index ahead of the statement text.
fn node_label(program: &Program, catalog: &ApiCatalog, node: StmtId) -> String {
    let stmt = program.stmt(node);
    let sig = &program.proc(stmt.proc).sig;
    match stmt.kind {
        StmtKind::Entry => format!("Entry{}", sig),
        StmtKind::Exit => format!("Exit{}", sig),
        _ => {
            let short = catalog
                .match_stmt(stmt)
                .map(|info| info.short_code.as_str())
                .unwrap_or("no");
            let index = stmt.index.unwrap_or_default();
            format!(
                "{}-{}-{}: {}",
                kind_name(&stmt.kind),
                short,
                index,
                stmt.text.replace('"', "\\\"")
            )
        }
    }
}

fn kind_name(kind: &StmtKind) -> &'static str {
    match kind {
        StmtKind::Ordinary => "Stmt",
        StmtKind::Invoke(_) => "Invoke",
        StmtKind::Return(_) => "Return",
        StmtKind::Entry => "Entry",
        StmtKind::Exit => "Exit",
        StmtKind::Nop => "Nop",
    }
}

fn flow_edge_label(edge: &StmtEdge) -> String {
    match edge.kind {
        EdgeKind::SwitchCase(value) => format!("{}\\n[case {}]", kind_label(edge.kind), value),
        EdgeKind::Exceptional => {
            let types: Vec<&str> = edge.exceptions.iter().map(|t| simple_name(t)).collect();
            format!("{}\\n[{}]", kind_label(edge.kind), types.join(", "))
        }
        kind => kind_label(kind).to_string(),
    }
}

fn ipdg_edge_style(edge: &IpdgEdge) -> (String, &'static str) {
    match edge {
        IpdgEdge::Normal(inner) => (kind_label(inner.kind).to_string(), ""),
        IpdgEdge::Call { .. } => ("CALL".to_string(), ",style=dashed,color=blue"),
        IpdgEdge::Return { .. } => ("RETURN".to_string(), ",style=dashed,color=red"),
        IpdgEdge::CallToReturn { .. } => ("CALL2RET".to_string(), ""),
    }
}

fn kind_label(kind: EdgeKind) -> &'static str {
    match kind {
        EdgeKind::FallThrough => "FALL_THROUGH",
        EdgeKind::Goto => "GOTO",
        EdgeKind::SwitchCase(_) => "SWITCH_CASE",
        EdgeKind::Exceptional => "EXCEPTIONAL",
        EdgeKind::ControlDep => "CONTROL_DEP",
        EdgeKind::DataDep => "DATA_DEP",
        EdgeKind::Return => "RETURN",
    }
}

fn simple_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

/// File name for one procedure dump: the signature with `<`, `>`, `[`, `]` flattened to
/// underscores, truncated past the filesystem-friendly limit.
pub fn dot_file_name(sig: &Signature) -> String {
    let mut name = sig.to_string();
    if name.chars().count() > FILENAME_LIMIT {
        name = name.chars().take(FILENAME_LIMIT).collect();
        name.push_str("...");
    }
    let name: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | '[' | ']' => '_',
            c => c,
        })
        .collect();
    format!("{}.dot", name)
}

/// File name for one sliced interprocedural dump, indexed per subgraph.
pub fn slice_dot_file_name(stem: &str, idx: usize) -> String {
    format!("{}-{{{}}}-slice.dot", stem, idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicir_core::analysis::UNBOUNDED_DEPTH;
    use slicir_core::callgraph::CallGraph;
    use slicir_core::ir::CallExpr;

    const CATALOG: &str = r#"[
        {
            "categoryName": "Database",
            "fine-grainedType": [
                {
                    "subcategoryName": "SQL execution",
                    "short": "sq",
                    "apiNames": ["<java.sql.Statement: executeQuery(java.lang.String)>"]
                }
            ]
        }
    ]"#;

    const APP_CATALOG: &str = r#"[
        {
            "categoryName": "Internal",
            "fine-grainedType": [
                {
                    "subcategoryName": "Dao access",
                    "short": "ipc",
                    "apiNames": ["<com.app.Dao: get()>"]
                }
            ]
        }
    ]"#;

    fn fixture() -> (Program, StmtGraph) {
        let mut program = Program::new();
        let proc = program
            .declare_proc(Signature::parse("<com.app.Main: main()>").unwrap())
            .unwrap();
        let entry = program.alloc_stmt(proc, None, StmtKind::Entry, "entry");
        let call = program.alloc_stmt(
            proc,
            Some(0),
            StmtKind::Invoke(CallExpr::Direct {
                target: Signature::parse("<java.sql.Statement: executeQuery(java.lang.String)>")
                    .unwrap(),
            }),
            "rs = st.executeQuery(q)",
        );
        let ret = program.alloc_stmt(proc, Some(1), StmtKind::Return(Some("rs".into())), "return rs");
        let exit = program.alloc_stmt(proc, None, StmtKind::Exit, "exit");
        let mut g = StmtGraph::new(proc);
        g.set_entry(entry);
        g.add_node(call);
        g.add_node(ret);
        g.set_exit(exit);
        g.add_edge(StmtEdge::new(EdgeKind::ControlDep, entry, call));
        g.add_edge(StmtEdge::new(EdgeKind::DataDep, call, ret));
        g.add_edge(StmtEdge::new(EdgeKind::SwitchCase(3), call, ret));
        g.add_edge(StmtEdge::exceptional(
            call,
            exit,
            vec!["java.sql.SQLException".into()],
        ));
        (program, g)
    }

    #[test]
    fn labels_carry_kind_short_code_and_index() {
        let (program, graph) = fixture();
        let catalog = ApiCatalog::from_json(CATALOG).unwrap();
        let out = PdgDotEmitter::new(&program, &catalog)
            .emit_to_string(&graph)
            .unwrap();
        assert!(out.contains("digraph G {"));
        assert!(out.contains(NODE_ATTRIBUTES));
        assert!(out.contains(r#"label="Entry<com.app.Main: main()>""#));
        assert!(out.contains(r#"label="Exit<com.app.Main: main()>""#));
        assert!(out.contains("Invoke-sq-0: rs = st.executeQuery(q)"));
        assert!(out.contains("Return-no-1: return rs"));
    }

    #[test]
    fn edge_decorations_follow_the_kind() {
        let (program, graph) = fixture();
        let catalog = ApiCatalog::from_json(CATALOG).unwrap();
        let out = PdgDotEmitter::new(&program, &catalog)
            .emit_to_string(&graph)
            .unwrap();
        assert!(out.contains(r#""0" -> "1" [label="CONTROL_DEP"];"#));
        assert!(out.contains(r#""1" -> "2" [label="DATA_DEP"];"#));
        assert!(out.contains("SWITCH_CASE\\n[case 3]"));
        assert!(out.contains("EXCEPTIONAL\\n[SQLException]"));
        assert!(out.contains(",color=red"));
    }

    #[test]
    fn quotes_in_statement_text_are_escaped() {
        let mut program = Program::new();
        let proc = program
            .declare_proc(Signature::parse("<com.app.Main: main()>").unwrap())
            .unwrap();
        let stmt = program.alloc_stmt(proc, Some(0), StmtKind::Ordinary, r#"s = "lit""#);
        let mut g = StmtGraph::new(proc);
        g.add_node(stmt);
        let catalog = ApiCatalog::default();
        let out = PdgDotEmitter::new(&program, &catalog)
            .emit_to_string(&g)
            .unwrap();
        assert!(out.contains(r#"Stmt-no-0: s = \"lit\""#));
    }

    #[test]
    fn interprocedural_dump_styles_call_edges() {
        let mut program = Program::new();
        let dao_sig = Signature::parse("<com.app.Dao: get()>").unwrap();
        let dao = program.declare_proc(dao_sig.clone()).unwrap();
        let main = program
            .declare_proc(Signature::parse("<com.app.Main: main()>").unwrap())
            .unwrap();

        let d_entry = program.alloc_stmt(dao, None, StmtKind::Entry, "entry");
        let d0 = program.alloc_stmt(dao, Some(0), StmtKind::Return(Some("v".into())), "return v");
        let d_exit = program.alloc_stmt(dao, None, StmtKind::Exit, "exit");
        let mut d_cfg = StmtGraph::new(dao);
        d_cfg.set_entry(d_entry);
        d_cfg.add_node(d0);
        d_cfg.set_exit(d_exit);
        d_cfg.add_edge(StmtEdge::new(EdgeKind::FallThrough, d_entry, d0));
        d_cfg.add_edge(StmtEdge::new(EdgeKind::FallThrough, d0, d_exit));
        program.define_body(dao, vec![d0], d_cfg, Default::default());

        let m_entry = program.alloc_stmt(main, None, StmtKind::Entry, "entry");
        let m0 = program.alloc_stmt(
            main,
            Some(0),
            StmtKind::Invoke(CallExpr::Direct { target: dao_sig }),
            "x = dao.get()",
        );
        let m_exit = program.alloc_stmt(main, None, StmtKind::Exit, "exit");
        let mut m_cfg = StmtGraph::new(main);
        m_cfg.set_entry(m_entry);
        m_cfg.add_node(m0);
        m_cfg.set_exit(m_exit);
        m_cfg.add_edge(StmtEdge::new(EdgeKind::FallThrough, m_entry, m0));
        m_cfg.add_edge(StmtEdge::new(EdgeKind::FallThrough, m0, m_exit));
        program.define_body(main, vec![m0], m_cfg, Default::default());

        let graph = CallGraph::build(&program, "app", [main, dao]);
        let catalog = ApiCatalog::from_json(APP_CATALOG).unwrap();
        let ipdg = SlicedIpdg::build(&program, &graph, &catalog, UNBOUNDED_DEPTH);

        let out = IpdgDotEmitter::new(&catalog).emit_to_string(&ipdg).unwrap();
        assert!(out.contains(r#"label="CALL",style=dashed,color=blue"#));
        assert!(out.contains("Invoke-ipc-0: x = dao.get()"));
        assert!(out.contains("Exit<com.app.Dao: get()>"));
    }

    #[test]
    fn file_names_flatten_and_truncate() {
        let sig = Signature::parse("<com.app.Main: main(java.lang.String[])>").unwrap();
        let name = dot_file_name(&sig);
        assert!(name.ends_with(".dot"));
        assert!(!name.contains('<'));
        assert!(!name.contains('['));

        let long = Signature::new("com.app.Type", "m", vec!["x".repeat(300)]);
        assert!(dot_file_name(&long).contains("..."));

        assert_eq!(slice_dot_file_name("app", 0), "app-{0}-slice.dot");
    }
}
