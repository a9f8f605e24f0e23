//! Format diff and analysis reports for human consumption.

use crate::analyzers::AnalysisReport;
use crate::compare::DiffReport;

/// Render a graph comparison. The labels name the graphs the way the
/// comparison was invoked: `a` is the theoretical model, `b` the generated
/// one.
pub fn format_diff(report: &DiffReport, a_label: &str, b_label: &str) -> String {
    let mut output = String::new();

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output.push_str("  uimap Graph Comparison\n");
    output.push_str("═══════════════════════════════════════════════════════════════════════\n\n");
    output.push_str(&format!("Differences found:      {}\n\n", report.total()));

    output.push_str(&format!(
        "─── {} vs {} ───────────────────────────────────────────\n",
        a_label, b_label
    ));
    format_pass(
        &mut output,
        &report.missing_states_in_b,
        &report.missing_transitions_in_b,
        &report.mismatches_in_b,
        b_label,
    );

    output.push_str(&format!(
        "\n─── {} vs {} ───────────────────────────────────────────\n",
        b_label, a_label
    ));
    format_pass(
        &mut output,
        &report.missing_states_in_a,
        &report.missing_transitions_in_a,
        &report.mismatches_in_a,
        a_label,
    );

    if report.is_empty() {
        output.push_str("\n[NO DIFFERENCES FOUND]\n");
    }
    output.push_str("\n═══════════════════════════════════════════════════════════════════════\n");
    output
}

fn format_pass(
    output: &mut String,
    missing_states: &[crate::compare::MissingState],
    missing_transitions: &[crate::compare::MissingTransition],
    mismatches: &[crate::compare::DestinationMismatch],
    absent_in: &str,
) {
    for state in missing_states {
        output.push_str(&format!(
            "[MISSING NODE] {} not in {}\n",
            state.name, absent_in
        ));
    }
    for transition in missing_transitions {
        output.push_str(&format!(
            "[MISSING TRANSITION] {} -/-> {} via {}\n",
            transition.source,
            transition.destination,
            transition.action_template.display()
        ));
    }
    for mismatch in mismatches {
        output.push_str(&format!(
            "[MISMATCH TRANSITION] Supposed: {} -/-> {} Real: {} -> {}\n",
            mismatch.source,
            mismatch.expected_destination,
            mismatch.source,
            mismatch.actual_destination
        ));
    }
    if missing_states.is_empty() && missing_transitions.is_empty() && mismatches.is_empty() {
        output.push_str("(no differences in this direction)\n");
    }
}

/// Render the results of an analyzer registry run.
pub fn format_analysis(reports: &[AnalysisReport]) -> String {
    let mut output = String::new();

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output.push_str("  uimap Coverage Analysis\n");
    output.push_str("═══════════════════════════════════════════════════════════════════════\n");

    for report in reports {
        output.push_str(&format!(
            "\n─── {} ───────────────────────────────────────────────\n",
            report.analyzer
        ));
        if report.findings.is_empty() {
            output.push_str("nothing to report\n");
        } else {
            for finding in &report.findings {
                output.push_str(&format!("  {finding}\n"));
            }
        }
    }

    output.push_str("\n═══════════════════════════════════════════════════════════════════════\n");
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::default_analyzers;
    use crate::compare::compare;
    use uimap_graph::{Action, Graph};

    fn two_state_graph() -> Graph {
        let mut g = Graph::new();
        let a = g.add_state_with_template("A", "a.png");
        let b = g.add_state_with_template("B", "b.png");
        g.set_start(a).unwrap();
        g.add_transition(
            a,
            b,
            Action::Click {
                template: "go.png".into(),
            },
        )
        .unwrap();
        g
    }

    #[test]
    fn test_format_diff_no_differences() {
        let g = two_state_graph();
        let formatted = format_diff(&compare(&g, &g), "theoretical", "generated");
        assert!(formatted.contains("Differences found:      0"));
        assert!(formatted.contains("[NO DIFFERENCES FOUND]"));
    }

    #[test]
    fn test_format_diff_missing_transition() {
        let theoretical = two_state_graph();
        let mut generated = two_state_graph();
        let a = generated.find_state_by_name("A").unwrap();
        let b = generated.find_state_by_name("B").unwrap();
        generated.remove_transition_to(a, b).unwrap();

        let formatted = format_diff(
            &compare(&theoretical, &generated),
            "theoretical",
            "generated",
        );
        assert!(formatted.contains("[MISSING TRANSITION] A -/-> B via go.png"));
        assert!(formatted.contains("Differences found:      1"));
    }

    #[test]
    fn test_format_analysis_lists_each_analyzer() {
        let g = two_state_graph();
        let reports: Vec<_> = default_analyzers()
            .iter()
            .map(|a| a.analyze(&g))
            .collect();

        let formatted = format_analysis(&reports);
        assert!(formatted.contains("duplicate-edges"));
        assert!(formatted.contains("prime-paths"));
        assert!(formatted.contains("self-loops"));
        assert!(formatted.contains("total-connectivity"));
        assert!(formatted.contains("A -> B"));
        assert!(formatted.contains("nothing to report"));
    }
}
