/*! Dependence analyses over statement graphs.
 *
 * Security slicing needs to know which statements influence a sensitive call and which ones
 * it influences. These passes provide the chain that answers that: postdominance and control
 * dependence, per-procedure dependence graphs, catalog-anchored slicing, and the stitched
 * interprocedural graph with its bounded slice.
 */

pub mod cache;
pub mod dominance;
pub mod ipdg;
pub mod pdg;
pub mod slice;

pub use cache::{AnalysisCache, CacheStatistics};
pub use dominance::ControlDependence;
pub use ipdg::{IpdgEdge, SlicedIpdg, UNBOUNDED_DEPTH};
pub use pdg::{build_full_pdg, build_light_pdg};
pub use slice::{slice_pdg, Direction, SliceSession, VisitState};
