/*! Emitters for dependence graphs and slice results.
 *
 * Analysis output leaves the process two ways: Graphviz dumps for inspection and feature
 * extraction, and slice reports for the command line. Both share one writer-generic emitter
 * trait so output can target files, buffers, or stdout alike.
 */

pub mod dot;
pub mod emitter;
pub mod report;

pub use dot::{dot_file_name, slice_dot_file_name, IpdgDotEmitter, PdgDotEmitter};
pub use emitter::{EmitContext, EmitHelper, EmitResult, Emitter};
pub use report::{ReportEmitter, SliceEntry, SliceReport};
