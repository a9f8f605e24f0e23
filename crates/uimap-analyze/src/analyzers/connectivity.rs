//! Total connectivity: reachability from the designated start state.

use std::collections::BTreeSet;
use std::path::PathBuf;

use log::warn;
use serde::Serialize;
use uimap_graph::{Graph, StateId, Transition};

use super::{AnalysisReport, Analyzer};

/// A transition never reached from the start state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnreachedTransition {
    pub source: String,
    pub destination: String,
    pub action_template: PathBuf,
}

/// Everything the traversal did not reach.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectivityReport {
    pub unreached_states: Vec<String>,
    pub unreached_transitions: Vec<UnreachedTransition>,
}

impl ConnectivityReport {
    /// Whether every state and transition was reached.
    pub fn is_fully_connected(&self) -> bool {
        self.unreached_states.is_empty() && self.unreached_transitions.is_empty()
    }
}

/// Depth-first reachability with the default guard (always true).
pub fn total_connectivity(graph: &Graph) -> ConnectivityReport {
    total_connectivity_with_guard(graph, |_, _, _| true)
}

/// Depth-first reachability from the start state, following only
/// transitions whose guard predicate evaluates true.
///
/// A reached state's transitions all count as reached (they were
/// examined), but only guard-true ones are followed. A graph without a
/// designated start state reaches nothing.
pub fn total_connectivity_with_guard<F>(graph: &Graph, guard: F) -> ConnectivityReport
where
    F: Fn(&Graph, StateId, &Transition) -> bool,
{
    let mut reached_states: BTreeSet<StateId> = BTreeSet::new();
    let mut reached_transitions: BTreeSet<(StateId, usize)> = BTreeSet::new();

    match graph.start() {
        Some(start) => {
            let mut stack = vec![start];
            while let Some(id) = stack.pop() {
                if !reached_states.insert(id) {
                    continue;
                }
                for (index, transition) in graph[id].transitions().iter().enumerate() {
                    reached_transitions.insert((id, index));
                    if guard(graph, id, transition) && !reached_states.contains(&transition.target)
                    {
                        stack.push(transition.target);
                    }
                }
            }
        }
        None => {
            if !graph.is_empty() {
                warn!("graph has no start state, nothing is reachable");
            }
        }
    }

    let mut report = ConnectivityReport::default();
    for (id, state) in graph.states() {
        if !reached_states.contains(&id) {
            report.unreached_states.push(state.name().to_owned());
        }
        for (index, transition) in state.transitions().iter().enumerate() {
            if !reached_transitions.contains(&(id, index)) {
                report.unreached_transitions.push(UnreachedTransition {
                    source: state.name().to_owned(),
                    destination: graph[transition.target].name().to_owned(),
                    action_template: transition.action.template().to_owned(),
                });
            }
        }
    }
    report
}

pub struct TotalConnectivityChecker;

impl Analyzer for TotalConnectivityChecker {
    fn name(&self) -> &'static str {
        "total-connectivity"
    }

    fn analyze(&self, graph: &Graph) -> AnalysisReport {
        let result = total_connectivity(graph);
        let mut findings: Vec<String> = result
            .unreached_states
            .into_iter()
            .map(|s| format!("state '{s}' never reached"))
            .collect();
        findings.extend(result.unreached_transitions.into_iter().map(|t| {
            format!(
                "transition '{}' -> '{}' via {} never reached",
                t.source,
                t.destination,
                t.action_template.display()
            )
        }));
        AnalysisReport {
            analyzer: self.name(),
            findings,
        }
    }
}
