/*! Lower parsed facts into programs and call-graph subgraphs.
 *
 * Lowering is two-phase. Procedure blocks are materialized as they arrive, so statement ids come
 * out in file order; subgraph blocks are only collected, then resolved once every source was
 * added, so a subgraph may list procedures a later file declares.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use pest::iterators::{Pair, Pairs};
use thiserror::Error;
use walkdir::WalkDir;

use slicir_core::callgraph::CallGraph;
use slicir_core::graph::{EdgeKind, StmtEdge, StmtGraph};
use slicir_core::ir::{CallExpr, ProcId, Program, StmtId, StmtKind};
use slicir_core::sig::Signature;

use crate::{parse, Rule};

#[derive(Error, Debug)]
pub enum FactsError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("Cannot read {}: {source}", .path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("{proc}: statement index {index} out of range")]
    BadIndex { proc: String, index: usize },
    #[error("{proc}: duplicate statement {index}")]
    DuplicateStmt { proc: String, index: usize },
    #[error("{proc}: missing statement {index}")]
    MissingStmt { proc: String, index: usize },
    #[error("Integer out of range: {0}")]
    BadInt(String),
    #[error("Subgraph {subgraph:?} lists undeclared procedure {sig}")]
    UnknownMember { subgraph: String, sig: String },
    #[error("Unexpected parse shape in {0}")]
    Shape(&'static str),
    #[error(transparent)]
    Core(#[from] slicir_core::PdgError),
}

/// A lowered facts bundle: the program plus its call-graph subgraphs.
#[derive(Debug)]
pub struct ParsedFacts {
    pub program: Program,
    pub subgraphs: Vec<CallGraph>,
}

/// Accumulates facts sources into one program.
#[derive(Debug, Default)]
pub struct Lowerer {
    program: Program,
    subgraphs: Vec<(String, Vec<Signature>)>,
}

impl Lowerer {
    pub fn new() -> Lowerer {
        Lowerer::default()
    }

    pub fn add_source(&mut self, input: &str) -> Result<(), FactsError> {
        for pair in parse(input)? {
            if pair.as_rule() != Rule::facts {
                continue;
            }
            for block in pair.into_inner() {
                match block.as_rule() {
                    Rule::proc_block => self.lower_proc(block)?,
                    Rule::subgraph_block => self.collect_subgraph(block)?,
                    Rule::EOI => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Resolve the collected subgraphs and build their call graphs. Sources with no subgraph
    /// block get one implicit subgraph spanning every declared procedure.
    pub fn finish(self) -> Result<ParsedFacts, FactsError> {
        let Lowerer { program, subgraphs } = self;
        let mut graphs = Vec::new();
        if subgraphs.is_empty() {
            let members: Vec<ProcId> = program.procs().map(|p| p.id).collect();
            graphs.push(CallGraph::build(&program, "all", members));
        } else {
            for (name, sigs) in subgraphs {
                let mut members = Vec::with_capacity(sigs.len());
                for sig in sigs {
                    let id =
                        program
                            .proc_by_sig(&sig)
                            .ok_or_else(|| FactsError::UnknownMember {
                                subgraph: name.clone(),
                                sig: sig.to_string(),
                            })?;
                    members.push(id);
                }
                graphs.push(CallGraph::build(&program, name, members));
            }
        }
        Ok(ParsedFacts {
            program,
            subgraphs: graphs,
        })
    }

    fn lower_proc(&mut self, block: Pair<'_, Rule>) -> Result<(), FactsError> {
        let mut inner = block.into_inner();
        let sig = Signature::parse(string_value(&next_pair(&mut inner, "proc")?))?;
        let proc_name = sig.to_string();
        let proc = self.program.declare_proc(sig)?;

        // Collect declarations first so statements allocate densely in body order
        // regardless of their order in the file.
        let mut decls: BTreeMap<usize, (StmtKind, String)> = BTreeMap::new();
        let mut flows = Vec::new();
        let mut defuse = Vec::new();
        for item in inner {
            match item.as_rule() {
                Rule::stmt_decl => {
                    let mut parts = item.into_inner();
                    let index = index_value(&next_pair(&mut parts, "stmt")?)?;
                    let decl = lower_stmt_kind(next_pair(&mut parts, "stmt")?)?;
                    if decls.insert(index, decl).is_some() {
                        return Err(FactsError::DuplicateStmt {
                            proc: proc_name,
                            index,
                        });
                    }
                }
                Rule::flow_decl => flows.push(lower_flow(item)?),
                Rule::defuse_decl => {
                    let mut parts = item.into_inner();
                    let def = index_value(&next_pair(&mut parts, "defuse")?)?;
                    let use_site = index_value(&next_pair(&mut parts, "defuse")?)?;
                    defuse.push((def, use_site));
                }
                _ => {}
            }
        }
        for index in 0..decls.len() {
            if !decls.contains_key(&index) {
                return Err(FactsError::MissingStmt {
                    proc: proc_name,
                    index,
                });
            }
        }

        let entry = self.program.alloc_stmt(proc, None, StmtKind::Entry, "entry");
        let mut body = Vec::with_capacity(decls.len());
        for (index, (kind, text)) in decls {
            body.push(self.program.alloc_stmt(proc, Some(index as u32), kind, text));
        }
        let exit = self.program.alloc_stmt(proc, None, StmtKind::Exit, "exit");

        let mut cfg = StmtGraph::new(proc);
        cfg.set_entry(entry);
        for &stmt in &body {
            cfg.add_node(stmt);
        }
        cfg.set_exit(exit);

        let resolve = |end: RawEnd| -> Result<StmtId, FactsError> {
            match end {
                RawEnd::Entry => Ok(entry),
                RawEnd::Exit => Ok(exit),
                RawEnd::Index(i) if i < body.len() => Ok(body[i]),
                RawEnd::Index(i) => Err(FactsError::BadIndex {
                    proc: proc_name.clone(),
                    index: i,
                }),
            }
        };
        for flow in flows {
            let source = resolve(flow.source)?;
            let target = resolve(flow.target)?;
            cfg.add_edge(match flow.kind {
                RawKind::FallThrough => StmtEdge::new(EdgeKind::FallThrough, source, target),
                RawKind::Goto => StmtEdge::new(EdgeKind::Goto, source, target),
                RawKind::Case(value) => StmtEdge::new(EdgeKind::SwitchCase(value), source, target),
                RawKind::Throws(types) => StmtEdge::exceptional(source, target, types),
            });
        }

        let mut uses: IndexMap<StmtId, Vec<StmtId>> = IndexMap::new();
        for (def, use_site) in defuse {
            for index in [def, use_site] {
                if index >= body.len() {
                    return Err(FactsError::BadIndex {
                        proc: proc_name.clone(),
                        index,
                    });
                }
            }
            uses.entry(body[def]).or_default().push(body[use_site]);
        }

        self.program.define_body(proc, body, cfg, uses);
        Ok(())
    }

    fn collect_subgraph(&mut self, block: Pair<'_, Rule>) -> Result<(), FactsError> {
        let mut inner = block.into_inner();
        let name = string_value(&next_pair(&mut inner, "subgraph")?).to_string();
        let mut members = Vec::new();
        for sig_pair in inner {
            members.push(Signature::parse(string_value(&sig_pair))?);
        }
        self.subgraphs.push((name, members));
        Ok(())
    }
}

/// One-shot lowering of a single facts source.
pub fn parse_facts(input: &str) -> Result<ParsedFacts, FactsError> {
    let mut lowerer = Lowerer::new();
    lowerer.add_source(input)?;
    lowerer.finish()
}

/// Load a facts file, or every `.facts` file under a directory in path order.
pub fn load_path(path: impl AsRef<Path>) -> Result<ParsedFacts, FactsError> {
    let path = path.as_ref();
    let mut lowerer = Lowerer::new();
    if path.is_dir() {
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| FactsError::Io {
                path: e.path().unwrap_or(path).to_path_buf(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().map(|ext| ext == "facts").unwrap_or(false) {
                lowerer.add_source(&read_source(entry.path())?)?;
            }
        }
    } else {
        lowerer.add_source(&read_source(path)?)?;
    }
    lowerer.finish()
}

fn read_source(path: &Path) -> Result<String, FactsError> {
    std::fs::read_to_string(path).map_err(|e| FactsError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

enum RawEnd {
    Entry,
    Exit,
    Index(usize),
}

enum RawKind {
    FallThrough,
    Goto,
    Case(i64),
    Throws(Vec<String>),
}

struct RawFlow {
    source: RawEnd,
    target: RawEnd,
    kind: RawKind,
}

fn lower_stmt_kind(pair: Pair<'_, Rule>) -> Result<(StmtKind, String), FactsError> {
    match pair.as_rule() {
        Rule::invoke_stmt | Rule::dyninvoke_stmt => {
            let dynamic = pair.as_rule() == Rule::dyninvoke_stmt;
            let mut parts = pair.into_inner();
            let target = Signature::parse(string_value(&next_pair(&mut parts, "invoke")?))?;
            let text = string_value(&next_pair(&mut parts, "invoke")?).to_string();
            let call = if dynamic {
                CallExpr::Dynamic { bootstrap: target }
            } else {
                CallExpr::Direct { target }
            };
            Ok((StmtKind::Invoke(call), text))
        }
        Rule::assign_stmt => {
            let mut parts = pair.into_inner();
            let text = string_value(&next_pair(&mut parts, "assign")?).to_string();
            Ok((StmtKind::Ordinary, text))
        }
        Rule::return_stmt => {
            let var = pair.into_inner().next().map(|p| string_value(&p).to_string());
            let text = match &var {
                Some(v) => format!("return {}", v),
                None => "return".to_string(),
            };
            Ok((StmtKind::Return(var), text))
        }
        Rule::nop_stmt => Ok((StmtKind::Nop, "nop".to_string())),
        _ => Err(FactsError::Shape("stmt")),
    }
}

fn lower_flow(pair: Pair<'_, Rule>) -> Result<RawFlow, FactsError> {
    let mut parts = pair.into_inner();
    let source = endpoint_value(&next_pair(&mut parts, "flow")?)?;
    let target = endpoint_value(&next_pair(&mut parts, "flow")?)?;
    let kind = match parts.next() {
        None => RawKind::FallThrough,
        Some(kind_pair) => match kind_pair.as_rule() {
            Rule::goto_kind => RawKind::Goto,
            Rule::case_kind => {
                let mut inner = kind_pair.into_inner();
                RawKind::Case(int_value(&next_pair(&mut inner, "case")?)?)
            }
            Rule::throws_kind => RawKind::Throws(
                kind_pair
                    .into_inner()
                    .map(|t| t.as_str().to_string())
                    .collect(),
            ),
            _ => return Err(FactsError::Shape("flow")),
        },
    };
    Ok(RawFlow {
        source,
        target,
        kind,
    })
}

fn endpoint_value(pair: &Pair<'_, Rule>) -> Result<RawEnd, FactsError> {
    match pair.as_str() {
        "entry" => Ok(RawEnd::Entry),
        "exit" => Ok(RawEnd::Exit),
        text => text
            .parse()
            .map(RawEnd::Index)
            .map_err(|_| FactsError::BadInt(text.to_string())),
    }
}

fn next_pair<'i>(
    pairs: &mut Pairs<'i, Rule>,
    context: &'static str,
) -> Result<Pair<'i, Rule>, FactsError> {
    pairs.next().ok_or(FactsError::Shape(context))
}

/// Strip the surrounding quotes off a `string` token.
fn string_value<'i>(pair: &Pair<'i, Rule>) -> &'i str {
    let s = pair.as_str();
    &s[1..s.len() - 1]
}

fn index_value(pair: &Pair<'_, Rule>) -> Result<usize, FactsError> {
    pair.as_str()
        .parse()
        .map_err(|_| FactsError::BadInt(pair.as_str().to_string()))
}

fn int_value(pair: &Pair<'_, Rule>) -> Result<i64, FactsError> {
    pair.as_str()
        .parse()
        .map_err(|_| FactsError::BadInt(pair.as_str().to_string()))
}
