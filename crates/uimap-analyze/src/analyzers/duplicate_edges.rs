//! Duplicate-edge ("edge pair") detection.

use std::collections::BTreeMap;

use serde::Serialize;
use uimap_graph::Graph;

use super::{AnalysisReport, Analyzer};

/// More than one transition from `source` to `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateEdge {
    pub source: String,
    pub destination: String,
    pub count: usize,
}

/// Group each state's outgoing transitions by destination name and report
/// every (source, destination) pair with more than one transition, once
/// per pair, however many duplicates exist.
pub fn duplicate_edges(graph: &Graph) -> Vec<DuplicateEdge> {
    let mut found = Vec::new();
    for (_, state) in graph.states() {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for transition in state.transitions() {
            *counts.entry(graph[transition.target].name()).or_default() += 1;
        }
        for (destination, count) in counts {
            if count > 1 {
                found.push(DuplicateEdge {
                    source: state.name().to_owned(),
                    destination: destination.to_owned(),
                    count,
                });
            }
        }
    }
    found
}

pub struct DuplicateEdgeDetector;

impl Analyzer for DuplicateEdgeDetector {
    fn name(&self) -> &'static str {
        "duplicate-edges"
    }

    fn analyze(&self, graph: &Graph) -> AnalysisReport {
        let findings = duplicate_edges(graph)
            .into_iter()
            .map(|d| {
                format!(
                    "{} transitions from '{}' to '{}'",
                    d.count, d.source, d.destination
                )
            })
            .collect();
        AnalysisReport {
            analyzer: self.name(),
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::tests::scenario_graph;
    use uimap_graph::Action;

    fn click(template: &str) -> Action {
        Action::Click {
            template: template.into(),
        }
    }

    #[test]
    fn test_scenario_has_no_duplicates() {
        assert!(duplicate_edges(&scenario_graph()).is_empty());
    }

    #[test]
    fn test_duplicate_reported_once_per_pair() {
        let mut g = Graph::new();
        let a = g.add_state("A");
        let b = g.add_state("B");
        g.add_transition(a, b, click("one.png")).unwrap();
        g.add_transition(a, b, click("two.png")).unwrap();
        g.add_transition(a, b, click("three.png")).unwrap();

        let found = duplicate_edges(&g);
        assert_eq!(
            found,
            [DuplicateEdge {
                source: "A".into(),
                destination: "B".into(),
                count: 3
            }]
        );
    }

    #[test]
    fn test_same_destination_from_different_sources_is_fine() {
        let mut g = Graph::new();
        let a = g.add_state("A");
        let b = g.add_state("B");
        let c = g.add_state("C");
        g.add_transition(a, c, click("one.png")).unwrap();
        g.add_transition(b, c, click("two.png")).unwrap();

        assert!(duplicate_edges(&g).is_empty());
    }

    #[test]
    fn test_duplicate_self_loops_count() {
        let mut g = Graph::new();
        let a = g.add_state("A");
        g.add_transition(a, a, click("one.png")).unwrap();
        g.add_transition(a, a, click("two.png")).unwrap();

        let found = duplicate_edges(&g);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].count, 2);
    }
}
