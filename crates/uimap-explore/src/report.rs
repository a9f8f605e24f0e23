//! Format exploration session reports for human consumption.

use crate::explorer::ExplorationStats;
use uimap_graph::Graph;

/// Render an exploration summary with the generated graph's shape.
pub fn format_report(stats: &ExplorationStats, graph: &Graph) -> String {
    let mut output = String::new();

    output.push_str("═══════════════════════════════════════════════════════════════════════\n");
    output.push_str("  uimap Exploration Report\n");
    output.push_str("═══════════════════════════════════════════════════════════════════════\n\n");

    output.push_str(&format!(
        "States discovered:      {} ({} phantom)\n",
        stats.states_discovered, stats.phantom_states
    ));
    output.push_str(&format!(
        "Transitions recorded:   {}\n",
        stats.transitions_recorded
    ));
    output.push_str(&format!(
        "Actions performed:      {} ({} skipped after retries)\n",
        stats.actions_performed, stats.actions_failed
    ));
    output.push_str(&format!(
        "Recoveries:             {} ({} steps replayed, {} replay failures)\n",
        stats.recoveries, stats.replayed_steps, stats.failed_replays
    ));
    output.push_str(&format!(
        "Process launches:       {}\n",
        stats.process_launches
    ));
    output.push('\n');

    if graph.is_empty() {
        output.push_str("─── No States Discovered ───────────────────────────────────────────────\n");
    } else {
        output.push_str("─── States ─────────────────────────────────────────────────────────────\n");
        for (id, state) in graph.states() {
            let marker = if state.is_phantom() { " [phantom]" } else { "" };
            let start = if graph.start() == Some(id) { " [start]" } else { "" };
            output.push_str(&format!(
                "{}{}{}: {} outgoing\n",
                state.name(),
                marker,
                start,
                state.transitions().len()
            ));
            for transition in state.transitions() {
                output.push_str(&format!(
                    "    {} --{}--> {}\n",
                    transition.action.template().display(),
                    transition.action.kind(),
                    graph[transition.target].name()
                ));
            }
        }
    }

    output.push_str("\n═══════════════════════════════════════════════════════════════════════\n");
    output
}
