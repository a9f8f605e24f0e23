//! Self-loop detection.

use std::path::PathBuf;

use serde::Serialize;
use uimap_graph::Graph;

use super::{AnalysisReport, Analyzer};

/// A transition whose destination equals its own source state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfLoop {
    pub state: String,
    pub action_template: PathBuf,
}

/// Report every transition that loops back onto its source.
pub fn self_loops(graph: &Graph) -> Vec<SelfLoop> {
    let mut found = Vec::new();
    for (id, state) in graph.states() {
        for transition in state.transitions() {
            if transition.target == id {
                found.push(SelfLoop {
                    state: state.name().to_owned(),
                    action_template: transition.action.template().to_owned(),
                });
            }
        }
    }
    found
}

pub struct SelfLoopDetector;

impl Analyzer for SelfLoopDetector {
    fn name(&self) -> &'static str {
        "self-loops"
    }

    fn analyze(&self, graph: &Graph) -> AnalysisReport {
        let findings = self_loops(graph)
            .into_iter()
            .map(|l| format!("self loop in '{}' via {}", l.state, l.action_template.display()))
            .collect();
        AnalysisReport {
            analyzer: self.name(),
            findings,
        }
    }
}
