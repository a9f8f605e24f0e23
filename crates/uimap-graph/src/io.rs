//! Line-oriented graph persistence rooted at an images directory.
//!
//! This format is the only state that survives a process: the explorer
//! writes it, the comparator and the coverage analyzers read it back.
//!
//! ```text
//! # vertices first by convention, but not required on load
//! v <name> <relative-template-path>
//! e CLICK <src> <dst> <template>
//! e DOUBLE_CLICK <src> <dst> <template>
//! e CLICK_AND_TYPE <src> <dst> <template> <text>
//! e DRAG_AND_DROP <src> <dst> <drag-template> <drop-template>
//! ```
//!
//! Blank lines and `#` comments are skipped. Loading is best-effort: a
//! malformed line (unknown keyword, wrong argument count, dangling endpoint
//! reference) is logged and skipped, and the rest of the file still loads.

use std::fs;
use std::path::Path;

use log::{info, warn};
use snafu::Snafu;

use crate::graph::{Action, ActionKind, Graph};

/// Errors from graph file operations.
#[derive(Debug, Snafu)]
pub enum GraphIoError {
    #[snafu(display("I/O error"), context(false))]
    Io { source: std::io::Error },
}

/// Write `graph` to `path`, with template paths made relative to
/// `images_root`.
///
/// All vertex lines are written first; edge lines are collected while
/// walking the states and appended after them.
pub fn save(images_root: &Path, path: &Path, graph: &Graph) -> Result<(), GraphIoError> {
    info!("writing graph to {}", path.display());

    let mut vertices = String::new();
    let mut edges = String::new();

    for (_, state) in graph.states() {
        let name = sanitize(state.name());
        let template = if state.template().as_os_str().is_empty() {
            warn!("state `{}` has no template image", state.name());
            "unknown_image".to_owned()
        } else {
            relative(images_root, state.template())
        };
        vertices.push_str(&format!("v {} {}\n", name, template));

        for transition in state.transitions() {
            let dst = sanitize(graph[transition.target].name());
            let line = match &transition.action {
                Action::Click { template } | Action::DoubleClick { template } => format!(
                    "e {} {} {} {}\n",
                    transition.action.kind().keyword(),
                    name,
                    dst,
                    relative(images_root, template)
                ),
                Action::ClickAndType { template, text } => format!(
                    "e CLICK_AND_TYPE {} {} {} {}\n",
                    name,
                    dst,
                    relative(images_root, template),
                    text
                ),
                Action::DragAndDrop {
                    drag_template,
                    drop_template,
                } => format!(
                    "e DRAG_AND_DROP {} {} {} {}\n",
                    name,
                    dst,
                    relative(images_root, drag_template),
                    relative(images_root, drop_template)
                ),
            };
            edges.push_str(&line);
        }
    }

    fs::write(path, vertices + &edges)?;
    Ok(())
}

/// Load a graph from `path`, resolving template paths against
/// `images_root`.
///
/// The first state encountered becomes the start state (the format carries
/// no explicit designation).
pub fn load(path: &Path, images_root: &Path) -> Result<Graph, GraphIoError> {
    info!("loading graph from {}", path.display());

    let text = fs::read_to_string(path)?;
    let mut graph = Graph::new();

    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts[0] {
            "v" => parse_vertex(&mut graph, images_root, &parts, number + 1),
            "e" => parse_edge(&mut graph, images_root, &parts, number + 1),
            other => warn!("line {}: unknown record `{}`, skipping", number + 1, other),
        }
    }

    let first = graph.states().next().map(|(id, _)| id);
    if let Some(first) = first {
        // Serialized graphs carry no explicit start; the first vertex is it.
        let _ = graph.set_start(first);
    }

    Ok(graph)
}

fn parse_vertex(graph: &mut Graph, images_root: &Path, parts: &[&str], number: usize) {
    if parts.len() != 3 {
        warn!(
            "line {}: vertex needs 3 fields, got {}, skipping",
            number,
            parts.len()
        );
        return;
    }
    graph.add_state_with_template(parts[1], images_root.join(parts[2]));
}

fn parse_edge(graph: &mut Graph, images_root: &Path, parts: &[&str], number: usize) {
    if parts.len() < 4 {
        warn!("line {}: edge is missing endpoints, skipping", number);
        return;
    }

    let Some(kind) = ActionKind::from_keyword(parts[1]) else {
        warn!("line {}: unknown action `{}`, skipping", number, parts[1]);
        return;
    };

    let (Some(src), Some(dst)) = (
        graph.find_state_by_name(parts[2]),
        graph.find_state_by_name(parts[3]),
    ) else {
        warn!(
            "line {}: source or destination state not found for edge, skipping",
            number
        );
        return;
    };

    let action = match kind {
        ActionKind::Click | ActionKind::DoubleClick => {
            if parts.len() != 5 {
                warn!(
                    "line {}: {} needs 5 fields, got {}, skipping",
                    number,
                    kind,
                    parts.len()
                );
                return;
            }
            let template = images_root.join(parts[4]);
            if kind == ActionKind::Click {
                Action::Click { template }
            } else {
                Action::DoubleClick { template }
            }
        }
        ActionKind::ClickAndType => {
            if parts.len() != 6 {
                warn!(
                    "line {}: CLICK_AND_TYPE needs 6 fields, got {}, skipping",
                    number,
                    parts.len()
                );
                return;
            }
            Action::ClickAndType {
                template: images_root.join(parts[4]),
                text: parts[5].to_owned(),
            }
        }
        ActionKind::DragAndDrop => {
            if parts.len() != 6 {
                warn!(
                    "line {}: DRAG_AND_DROP needs 6 fields, got {}, skipping",
                    number,
                    parts.len()
                );
                return;
            }
            Action::DragAndDrop {
                drag_template: images_root.join(parts[4]),
                drop_template: images_root.join(parts[5]),
            }
        }
    };

    // Endpoints were just looked up, so this cannot fail; stay defensive
    // against future refactors anyway.
    if let Err(e) = graph.add_transition(src, dst, action) {
        warn!("line {}: {}", number, e);
    }
}

/// The format is whitespace-delimited; names with internal whitespace are
/// sanitized on save.
fn sanitize(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

fn relative(images_root: &Path, template: &Path) -> String {
    template
        .strip_prefix(images_root)
        .unwrap_or(template)
        .display()
        .to_string()
}
