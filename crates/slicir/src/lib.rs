/*! Unified interface for dependence-graph slicing.
 *
 * Single import for everything you need: parsing program facts, building dependence graphs,
 * slicing around sensitive calls, and emitting the results. Batteries-included entry point
 * for analysis pipelines.
 */

pub use slicir_core as core;
pub use slicir_emit as emit;
pub use slicir_parser as parser;

pub use slicir_core::{
    analysis::{build_full_pdg, build_light_pdg, slice_pdg, SlicedIpdg, UNBOUNDED_DEPTH},
    callgraph::CallGraph,
    catalog::ApiCatalog,
    graph::{EdgeKind, StmtEdge, StmtGraph},
    ir::{ProcId, Program, Stmt, StmtId, StmtKind},
    sig::Signature,
};

pub use slicir_emit::{IpdgDotEmitter, PdgDotEmitter, ReportEmitter};

pub use slicir_parser::{load_path, parse, parse_facts};
