//! Bidirectional structural diff between two screen-state graphs.
//!
//! States are matched across graphs by their recognition template, and
//! transitions by their primary action template; names may differ between
//! a hand-authored model and a generated one, templates are the ground
//! truth both share.

use std::path::PathBuf;

use log::debug;
use serde::Serialize;
use uimap_graph::Graph;

/// A state present in one graph with no template-equivalent in the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingState {
    pub name: String,
    pub template: PathBuf,
}

/// A transition whose matched source state has no counterpart edge with
/// the same action template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingTransition {
    pub source: String,
    pub destination: String,
    pub action_template: PathBuf,
}

/// A transition present in both graphs (same source template, same action
/// template) but ending on different destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationMismatch {
    pub source: String,
    pub action_template: PathBuf,
    pub expected_destination: String,
    pub actual_destination: String,
}

/// Output of [`compare`]: the two passes' findings in separate buckets, so
/// "missing from b" and "missing from a" stay distinguishable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffReport {
    pub missing_states_in_b: Vec<MissingState>,
    pub missing_states_in_a: Vec<MissingState>,
    pub missing_transitions_in_b: Vec<MissingTransition>,
    pub missing_transitions_in_a: Vec<MissingTransition>,
    pub mismatches_in_b: Vec<DestinationMismatch>,
    pub mismatches_in_a: Vec<DestinationMismatch>,
}

impl DiffReport {
    /// Total number of differences across all buckets.
    pub fn total(&self) -> usize {
        self.missing_states_in_b.len()
            + self.missing_states_in_a.len()
            + self.missing_transitions_in_b.len()
            + self.missing_transitions_in_a.len()
            + self.mismatches_in_b.len()
            + self.mismatches_in_a.len()
    }

    /// Whether the two graphs are structurally equivalent.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Compare two graphs in both directions.
pub fn compare(a: &Graph, b: &Graph) -> DiffReport {
    let mut report = DiffReport::default();
    diff_pass(
        a,
        b,
        &mut report.missing_states_in_b,
        &mut report.missing_transitions_in_b,
        &mut report.mismatches_in_b,
    );
    diff_pass(
        b,
        a,
        &mut report.missing_states_in_a,
        &mut report.missing_transitions_in_a,
        &mut report.mismatches_in_a,
    );
    debug!("comparison found {} differences", report.total());
    report
}

/// One asymmetric pass: everything `from` has that `to` lacks or disagrees
/// on.
fn diff_pass(
    from: &Graph,
    to: &Graph,
    missing_states: &mut Vec<MissingState>,
    missing_transitions: &mut Vec<MissingTransition>,
    mismatches: &mut Vec<DestinationMismatch>,
) {
    for (_, state) in from.states() {
        let Some(matched_id) = to.find_state_by_template(state.template()) else {
            missing_states.push(MissingState {
                name: state.name().to_owned(),
                template: state.template().to_owned(),
            });
            continue;
        };
        let matched = &to[matched_id];

        for transition in state.transitions() {
            let action_template = transition.action.template();
            let expected_destination = &from[transition.target];

            match matched
                .transitions()
                .iter()
                .find(|t| t.action.template() == action_template)
            {
                None => missing_transitions.push(MissingTransition {
                    source: state.name().to_owned(),
                    destination: expected_destination.name().to_owned(),
                    action_template: action_template.to_owned(),
                }),
                Some(counterpart) => {
                    let actual_destination = &to[counterpart.target];
                    if actual_destination.template() != expected_destination.template() {
                        mismatches.push(DestinationMismatch {
                            source: state.name().to_owned(),
                            action_template: action_template.to_owned(),
                            expected_destination: expected_destination.name().to_owned(),
                            actual_destination: actual_destination.name().to_owned(),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uimap_graph::Action;

    fn click(template: &str) -> Action {
        Action::Click {
            template: template.into(),
        }
    }

    /// A->B via img1, A->C via img2, B->B via img3.
    fn sample_graph() -> Graph {
        let mut g = Graph::new();
        let a = g.add_state_with_template("A", "imgs/a.png");
        let b = g.add_state_with_template("B", "imgs/b.png");
        let c = g.add_state_with_template("C", "imgs/c.png");
        g.set_start(a).unwrap();
        g.add_transition(a, b, click("imgs/img1.png")).unwrap();
        g.add_transition(a, c, click("imgs/img2.png")).unwrap();
        g.add_transition(b, b, click("imgs/img3.png")).unwrap();
        g
    }

    #[test]
    fn test_identity_compare_is_empty() {
        let g = sample_graph();
        let report = compare(&g, &g);
        assert!(report.is_empty());
        assert_eq!(report.total(), 0);
    }

    #[test]
    fn test_missing_transition_reported_in_one_bucket_only() {
        let theoretical = sample_graph();
        let mut generated = sample_graph();
        let a = generated.find_state_by_name("A").unwrap();
        let b = generated.find_state_by_name("B").unwrap();
        generated.remove_transition_to(a, b).unwrap();

        let report = compare(&theoretical, &generated);
        assert_eq!(report.missing_transitions_in_b.len(), 1);
        let missing = &report.missing_transitions_in_b[0];
        assert_eq!(missing.source, "A");
        assert_eq!(missing.destination, "B");
        assert_eq!(missing.action_template, PathBuf::from("imgs/img1.png"));
        // Nothing about the A->B edge shows up in the reverse bucket.
        assert!(report.missing_transitions_in_a.is_empty());
        assert!(report.mismatches_in_a.is_empty());
        assert!(report.mismatches_in_b.is_empty());
        assert_eq!(report.total(), 1);
    }

    #[test]
    fn test_missing_state_reported() {
        let theoretical = sample_graph();
        let mut generated = sample_graph();
        let c = generated.find_state_by_name("C").unwrap();
        generated.remove_state(c).unwrap();

        let report = compare(&theoretical, &generated);
        assert_eq!(report.missing_states_in_b.len(), 1);
        assert_eq!(report.missing_states_in_b[0].name, "C");
        assert!(report.missing_states_in_a.is_empty());
        // The A->C edge vanished with the state.
        assert_eq!(report.missing_transitions_in_b.len(), 1);
        assert_eq!(report.missing_transitions_in_b[0].destination, "C");
    }

    #[test]
    fn test_destination_mismatch_records_both_ends() {
        let theoretical = sample_graph();

        // Same action template out of A, but it lands on C instead of B.
        let mut generated = Graph::new();
        let a = generated.add_state_with_template("A", "imgs/a.png");
        let b = generated.add_state_with_template("B", "imgs/b.png");
        let c = generated.add_state_with_template("C", "imgs/c.png");
        generated.set_start(a).unwrap();
        generated.add_transition(a, c, click("imgs/img1.png")).unwrap();
        generated.add_transition(a, c, click("imgs/img2.png")).unwrap();
        generated.add_transition(b, b, click("imgs/img3.png")).unwrap();

        let report = compare(&theoretical, &generated);
        assert_eq!(report.mismatches_in_b.len(), 1);
        let mismatch = &report.mismatches_in_b[0];
        assert_eq!(mismatch.source, "A");
        assert_eq!(mismatch.expected_destination, "B");
        assert_eq!(mismatch.actual_destination, "C");

        // The reverse pass sees the same disagreement from the other side.
        assert_eq!(report.mismatches_in_a.len(), 1);
        assert_eq!(report.mismatches_in_a[0].expected_destination, "C");
        assert_eq!(report.mismatches_in_a[0].actual_destination, "B");
    }

    #[test]
    fn test_compare_symmetry() {
        let theoretical = sample_graph();
        let mut generated = sample_graph();
        let b = generated.find_state_by_name("B").unwrap();
        generated.remove_state(b).unwrap();

        let forward = compare(&theoretical, &generated);
        let backward = compare(&generated, &theoretical);

        assert_eq!(forward.missing_states_in_b, backward.missing_states_in_a);
        assert_eq!(forward.missing_states_in_a, backward.missing_states_in_b);
        assert_eq!(
            forward.missing_transitions_in_b,
            backward.missing_transitions_in_a
        );
        assert_eq!(
            forward.missing_transitions_in_a,
            backward.missing_transitions_in_b
        );
    }

    #[test]
    fn test_states_matched_by_template_not_name() {
        let theoretical = sample_graph();

        // Generated graph names are machine-derived; templates line up.
        let mut generated = Graph::new();
        let a = generated.add_state_with_template("state_0", "imgs/a.png");
        let b = generated.add_state_with_template("state_1", "imgs/b.png");
        let c = generated.add_state_with_template("state_2", "imgs/c.png");
        generated.add_transition(a, b, click("imgs/img1.png")).unwrap();
        generated.add_transition(a, c, click("imgs/img2.png")).unwrap();
        generated.add_transition(b, b, click("imgs/img3.png")).unwrap();

        assert!(compare(&theoretical, &generated).is_empty());
    }
}
