//! Structural analysis of screen-state graphs.
//!
//! Two independent consumers of a discovered (or hand-authored) graph:
//!
//! - [`compare`]: bidirectional structural diff between a theoretical
//!   graph and a generated one, with "missing from generated" and "extra
//!   in generated" kept distinguishable
//! - [`analyzers`]: read-only test-adequacy checks behind a common
//!   [`analyzers::Analyzer`] capability and an explicit registry:
//!   duplicate-edge detection, prime-path enumeration, self-loop
//!   detection, total connectivity
//!
//! Neither consumer mutates the graphs it is given.

pub mod analyzers;
pub mod compare;
pub mod report;

pub use analyzers::{default_analyzers, AnalysisReport, Analyzer};
pub use compare::{compare, DestinationMismatch, DiffReport, MissingState, MissingTransition};
