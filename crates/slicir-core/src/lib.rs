/*! Core dependence-graph types and slicing analyses.
 *
 * Security slicing requires a statement-level representation where control flow, data flow,
 * and call structure are explicit. This crate provides the program model, the shared
 * statement-graph container, and the analysis chain over them: postdominance and control
 * dependence, per-procedure dependence graphs, catalog-anchored slicing, and the stitched
 * interprocedural graph. Everything here is deterministic and single-threaded.
 */

pub mod analysis;
pub mod callgraph;
pub mod catalog;
pub mod graph;
pub mod ir;
pub mod sig;

pub use analysis::{
    build_full_pdg, build_light_pdg, slice_pdg, AnalysisCache, ControlDependence, IpdgEdge,
    SliceSession, SlicedIpdg, UNBOUNDED_DEPTH,
};
pub use callgraph::CallGraph;
pub use catalog::{ApiCatalog, ApiInfo};
pub use graph::{EdgeKind, StmtEdge, StmtGraph};
pub use ir::{CallExpr, ProcId, Procedure, Program, Stmt, StmtId, StmtKind};
pub use sig::Signature;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdgError {
    #[error("Degenerate control flow: {0}")]
    DegenerateFlow(String),
    #[error("Unknown statement: {0}")]
    UnknownStmt(ir::StmtId),
    #[error("Graph has no {0} node")]
    MissingBoundary(&'static str),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Duplicate procedure: {0}")]
    DuplicateProcedure(String),
    #[error("Catalog error: {0}")]
    Catalog(String),
}

pub type Result<T> = std::result::Result<T, PdgError>;

#[cfg(test)]
mod tests;
