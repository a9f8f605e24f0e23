//! CLI for inspecting a template library before an exploration session.
//!
//! Exploration itself runs embedded, with a visual-oracle backend supplied
//! by the host; this binary covers the offline half of the workflow:
//! checking that the state library on disk is shaped the way the engine
//! will consume it.
//!
//! # Usage
//!
//! ```bash
//! # List the states and action templates a library provides
//! uimap-explore scan --images imgs/
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use uimap_explore::library::StateLibrary;

#[derive(Parser)]
#[command(name = "uimap-explore")]
#[command(about = "Template library tooling for uimap exploration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a template library and report the states it defines.
    Scan {
        /// Root of the template library (one directory per state).
        #[arg(short, long)]
        images: PathBuf,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Scan { images } => cmd_scan(&images),
    }
}

fn cmd_scan(images: &Path) {
    if !images.is_dir() {
        eprintln!("Error: images directory not found: {}", images.display());
        std::process::exit(1);
    }

    let library = match StateLibrary::scan(images) {
        Ok(library) => library,
        Err(e) => {
            eprintln!("Error: failed to scan {}: {}", images.display(), e);
            std::process::exit(1);
        }
    };

    println!("Template library: {}", images.display());
    println!("States found:     {}", library.len());
    println!();

    for state in library.states() {
        println!("{}", state.name);
        println!("    template: {}", state.template.display());
        match &state.actions {
            Some(group) => {
                println!("    actions:  {} × {}", group.actions.len(), group.kind);
                for action in &group.actions {
                    println!("      {}", action.template().display());
                }
            }
            None => println!("    actions:  none"),
        }
    }

    if library.is_empty() {
        eprintln!();
        eprintln!("Warning: no state directories with recognition images found.");
        std::process::exit(1);
    }
}
