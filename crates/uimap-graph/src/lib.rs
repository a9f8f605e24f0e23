//! Screen-state graph model and its textual persistence format.
//!
//! A [`Graph`] models an interactive application as a finite-state machine:
//! each [`State`] is a recognizable screen (identified by a template image),
//! each [`Transition`] is one user [`Action`] and its observed effect. Graphs
//! are produced either by live exploration or by loading a hand-authored
//! model file; both roles use the identical data model.
//!
//! # Module Structure
//!
//! - [`graph`]: states, typed actions, transitions, the owning graph
//! - [`io`]: the line-oriented `v`/`e` file format rooted at an image
//!   directory
//!
//! Every `Graph` is an independent value; there is no shared or global
//! state anywhere in this crate.

pub mod graph;
pub mod io;

pub use graph::{Action, ActionKind, Graph, GraphError, State, StateId, Transition};
pub use io::{load, save, GraphIoError};
