//! Coverage analyzers: read-only test-adequacy checks over one graph.
//!
//! Each analyzer exposes a typed result function and implements the common
//! [`Analyzer`] capability for registry-driven runs. The registry is an
//! explicit ordered list, with no discovery or reflection.

use serde::Serialize;
use uimap_graph::Graph;

pub mod connectivity;
pub mod duplicate_edges;
pub mod prime_paths;
pub mod self_loops;

pub use connectivity::{
    total_connectivity, total_connectivity_with_guard, ConnectivityReport, TotalConnectivityChecker,
    UnreachedTransition,
};
pub use duplicate_edges::{duplicate_edges, DuplicateEdge, DuplicateEdgeDetector};
pub use prime_paths::{prime_path_names, prime_paths, PrimePathEnumerator};
pub use self_loops::{self_loops, SelfLoop, SelfLoopDetector};

/// Uniform result of one analyzer run: one human-readable line per
/// finding. An empty findings list means the criterion is fully satisfied.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub analyzer: &'static str,
    pub findings: Vec<String>,
}

/// A read-only structural check over a graph.
pub trait Analyzer {
    /// Short name used in reports.
    fn name(&self) -> &'static str;

    /// Run the check. The graph is never mutated.
    fn analyze(&self, graph: &Graph) -> AnalysisReport;
}

/// The explicit, ordered analyzer registry.
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(DuplicateEdgeDetector),
        Box::new(PrimePathEnumerator),
        Box::new(SelfLoopDetector),
        Box::new(TotalConnectivityChecker),
    ]
}
