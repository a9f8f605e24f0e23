//! Prime-path enumeration.
//!
//! Depth-first enumeration of all simple paths from every state. When a
//! transition's target is already on the current path, the path is
//! retained both as-is and with that single loop-closing edge appended;
//! cycles are captured without unbounded repetition. From the collected
//! paths, only the *prime* ones survive: a path is prime if it is not a
//! contiguous sub-sequence of any other collected path.
//!
//! Complexity is combinatorial in graph size. That is acceptable for the
//! small, intentionally-authored UI models this targets, not for
//! arbitrary large graphs.

use itertools::Itertools;
use std::collections::BTreeSet;
use uimap_graph::{Graph, StateId};

use super::{AnalysisReport, Analyzer};

/// All prime paths of `graph`, as sequences of state ids.
pub fn prime_paths(graph: &Graph) -> Vec<Vec<StateId>> {
    let mut collected: BTreeSet<Vec<StateId>> = BTreeSet::new();
    for (id, _) in graph.states() {
        let mut current = vec![id];
        walk(graph, &mut current, &mut collected);
    }

    let paths: Vec<Vec<StateId>> = collected.into_iter().collect();
    paths
        .iter()
        .filter(|p| !paths.iter().any(|q| q != *p && contains_contiguous(q, p)))
        .cloned()
        .collect()
}

/// All prime paths, as sequences of state names.
pub fn prime_path_names(graph: &Graph) -> Vec<Vec<String>> {
    prime_paths(graph)
        .into_iter()
        .map(|path| {
            path.into_iter()
                .map(|id| graph[id].name().to_owned())
                .collect()
        })
        .collect()
}

fn walk(graph: &Graph, current: &mut Vec<StateId>, collected: &mut BTreeSet<Vec<StateId>>) {
    let last = current[current.len() - 1];
    let transitions = graph[last].transitions();

    if transitions.is_empty() {
        collected.insert(current.clone());
        return;
    }

    for transition in transitions {
        if current.contains(&transition.target) {
            // Close the cycle with one extra edge; keep the unclosed form
            // too.
            collected.insert(current.clone());
            let mut closed = current.clone();
            closed.push(transition.target);
            collected.insert(closed);
        } else {
            current.push(transition.target);
            walk(graph, current, collected);
            current.pop();
        }
    }
}

/// Whether `needle` occurs as a contiguous slice of `haystack`.
fn contains_contiguous(haystack: &[StateId], needle: &[StateId]) -> bool {
    needle.len() <= haystack.len() && haystack.windows(needle.len()).any(|w| w == needle)
}

pub struct PrimePathEnumerator;

impl Analyzer for PrimePathEnumerator {
    fn name(&self) -> &'static str {
        "prime-paths"
    }

    fn analyze(&self, graph: &Graph) -> AnalysisReport {
        let findings = prime_path_names(graph)
            .into_iter()
            .map(|path| path.iter().join(" -> "))
            .collect();
        AnalysisReport {
            analyzer: self.name(),
            findings,
        }
    }
}
