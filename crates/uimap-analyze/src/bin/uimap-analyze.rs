//! CLI for comparing and analyzing persisted screen-state graphs.
//!
//! # Usage
//!
//! ```bash
//! # Diff a hand-authored model against a generated one
//! uimap-analyze compare --theoretical model.txt --generated out/generated_graph.txt \
//!     --images imgs/
//!
//! # Run the coverage analyzers over a graph
//! uimap-analyze analyze --graph out/generated_graph.txt --images imgs/
//!
//! # Persist the text report and a JSON artifact next to the inputs
//! uimap-analyze analyze --graph out/generated_graph.txt --images imgs/ --output out/
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use uimap_analyze::analyzers::default_analyzers;
use uimap_analyze::compare::compare;
use uimap_analyze::report::{format_analysis, format_diff};
use uimap_graph::Graph;

#[derive(Parser)]
#[command(name = "uimap-analyze")]
#[command(about = "Structural diff and coverage analysis for uimap graphs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff a theoretical graph against a generated one, both directions.
    Compare {
        /// The hand-authored (expected) graph file.
        #[arg(short, long)]
        theoretical: PathBuf,

        /// The generated (observed) graph file.
        #[arg(short, long)]
        generated: PathBuf,

        /// Images root the graphs' template paths are relative to.
        #[arg(short, long)]
        images: PathBuf,

        /// Directory for report artifacts (report text + JSON).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the registered coverage analyzers over a graph.
    Analyze {
        /// The graph file to analyze.
        #[arg(short, long)]
        graph: PathBuf,

        /// Images root the graph's template paths are relative to.
        #[arg(short, long)]
        images: PathBuf,

        /// Directory for report artifacts (report text + JSON).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Compare {
            theoretical,
            generated,
            images,
            output,
        } => cmd_compare(&theoretical, &generated, &images, output.as_deref()),
        Commands::Analyze {
            graph,
            images,
            output,
        } => cmd_analyze(&graph, &images, output.as_deref()),
    }
}

fn load_graph(path: &Path, images: &Path) -> Graph {
    match uimap_graph::load(path, images) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: failed to load {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn write_artifact(dir: &Path, name: &str, contents: &str) {
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("Warning: failed to create {}: {}", dir.display(), e);
        return;
    }
    let path = dir.join(name);
    if let Err(e) = fs::write(&path, contents) {
        eprintln!("Warning: failed to save {}: {}", path.display(), e);
    } else {
        eprintln!("Saved {}", path.display());
    }
}

fn cmd_compare(theoretical: &Path, generated: &Path, images: &Path, output: Option<&Path>) {
    let theoretical_graph = load_graph(theoretical, images);
    let generated_graph = load_graph(generated, images);

    let diff = compare(&theoretical_graph, &generated_graph);
    let formatted = format_diff(&diff, "theoretical", "generated");
    println!("{formatted}");

    if let Some(dir) = output {
        write_artifact(dir, "comparison.txt", &formatted);
        match serde_json::to_string_pretty(&diff) {
            Ok(json) => write_artifact(dir, "comparison.json", &json),
            Err(e) => eprintln!("Warning: failed to serialize diff: {e}"),
        }
    }

    // Differences are findings, not failures of this tool; still signal
    // them to scripts.
    if !diff.is_empty() {
        std::process::exit(1);
    }
}

fn cmd_analyze(graph_file: &Path, images: &Path, output: Option<&Path>) {
    let graph = load_graph(graph_file, images);

    let reports: Vec<_> = default_analyzers()
        .iter()
        .map(|analyzer| analyzer.analyze(&graph))
        .collect();
    let formatted = format_analysis(&reports);
    println!("{formatted}");

    if let Some(dir) = output {
        write_artifact(dir, "analysis.txt", &formatted);
        match serde_json::to_string_pretty(&reports) {
            Ok(json) => write_artifact(dir, "analysis.json", &json),
            Err(e) => eprintln!("Warning: failed to serialize analysis: {e}"),
        }
    }
}
