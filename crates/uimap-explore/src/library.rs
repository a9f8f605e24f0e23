//! The on-disk template library of anticipated states.
//!
//! One directory per anticipated state under the images root. Each state
//! directory holds one recognition image (the first image file found in it;
//! the state takes its name from that file's stem) and an optional
//! `buttons/<kind>/` subtree of action templates:
//!
//! ```text
//! imgs/
//!   menu/
//!     menu.png                      # recognition template
//!     buttons/click/play_btn.png    # one action template per file
//!   settings/
//!     settings.png
//!     buttons/click_and_type/
//!       name_field.png              # pairs with name_field.txt
//!       name_field.txt              # literal text to type
//!   board/
//!     board.png
//!     buttons/drag_and_drop/
//!       drag1.png                   # pairs with drop1.png by suffix
//!       drop1.png
//! ```
//!
//! Directory enumeration order decides which image is "first" and which
//! state is tried first during recognition; that order is not guaranteed
//! stable across platforms and is deliberately left as-is.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use uimap_graph::{Action, ActionKind};

/// Image extensions recognized as templates.
pub const VALID_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// The action templates of one state, all of a single kind.
///
/// Only one kind is ever explored per state: the first
/// `buttons/<kind>/` directory that exists (probed in
/// [`ActionKind::ALL`] order) wins, even if it turns out to be empty.
#[derive(Debug, Clone)]
pub struct ActionGroup {
    pub kind: ActionKind,
    pub actions: Vec<Action>,
}

/// One anticipated state as found on disk.
#[derive(Debug, Clone)]
pub struct LibraryState {
    /// Stem of the recognition image file.
    pub name: String,
    /// The state's directory.
    pub dir: PathBuf,
    /// Full path of the recognition image.
    pub template: PathBuf,
    /// Action templates, if the state has a `buttons/` subtree.
    pub actions: Option<ActionGroup>,
}

/// The scanned template library.
#[derive(Debug, Clone)]
pub struct StateLibrary {
    root: PathBuf,
    states: Vec<LibraryState>,
}

impl StateLibrary {
    /// Scan `root` for state directories.
    ///
    /// Directories without a recognition image and entries that would
    /// duplicate an already-seen state name are skipped with a warning.
    pub fn scan(root: &Path) -> io::Result<Self> {
        let mut states: Vec<LibraryState> = Vec::new();

        for entry in fs::read_dir(root)? {
            let dir = entry?.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(template) = first_image(&dir)? else {
                warn!("no recognition image in {}, skipping", dir.display());
                continue;
            };
            let name = stem_of(&template);
            if states.iter().any(|s| s.name == name) {
                warn!(
                    "duplicate state name `{}` in {}, skipping",
                    name,
                    dir.display()
                );
                continue;
            }
            let actions = scan_actions(&dir)?;
            debug!(
                "library state `{}` ({} action templates)",
                name,
                actions.as_ref().map_or(0, |g| g.actions.len())
            );
            states.push(LibraryState {
                name,
                dir,
                template,
                actions,
            });
        }

        Ok(Self {
            root: root.to_owned(),
            states,
        })
    }

    /// The images root this library was scanned from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All states, in directory enumeration order.
    pub fn states(&self) -> &[LibraryState] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

fn first_image(dir: &Path) -> io::Result<Option<PathBuf>> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| VALID_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn image_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

fn scan_actions(state_dir: &Path) -> io::Result<Option<ActionGroup>> {
    for kind in ActionKind::ALL {
        let dir = state_dir.join("buttons").join(kind.dir_name());
        if !dir.is_dir() {
            continue;
        }
        let actions = match kind {
            ActionKind::Click => image_files(&dir)?
                .into_iter()
                .map(|template| Action::Click { template })
                .collect(),
            ActionKind::DoubleClick => image_files(&dir)?
                .into_iter()
                .map(|template| Action::DoubleClick { template })
                .collect(),
            ActionKind::ClickAndType => click_and_type_actions(&dir)?,
            ActionKind::DragAndDrop => drag_and_drop_actions(&dir)?,
        };
        if actions.is_empty() {
            warn!("action directory {} has no usable templates", dir.display());
        }
        return Ok(Some(ActionGroup { kind, actions }));
    }
    Ok(None)
}

/// Each template pairs with a same-stem `.txt` file holding the literal
/// text to type; templates without one are skipped.
fn click_and_type_actions(dir: &Path) -> io::Result<Vec<Action>> {
    let mut actions = Vec::new();
    for template in image_files(dir)? {
        let text_file = template.with_extension("txt");
        match fs::read_to_string(&text_file) {
            Ok(text) => actions.push(Action::ClickAndType {
                template,
                text: text.trim().to_owned(),
            }),
            Err(_) => warn!(
                "{} has no paired text file, skipping",
                template.display()
            ),
        }
    }
    Ok(actions)
}

/// Templates pair `drag<N>` with `drop<N>` by trailing numeric suffix;
/// unpaired drag files are skipped.
fn drag_and_drop_actions(dir: &Path) -> io::Result<Vec<Action>> {
    let files = image_files(dir)?;
    let mut actions = Vec::new();
    for drag in &files {
        let stem = stem_of(drag);
        let Some(suffix) = stem.strip_prefix("drag") else {
            continue;
        };
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let partner_stem = format!("drop{suffix}");
        match files.iter().find(|f| stem_of(f) == partner_stem) {
            Some(drop) => actions.push(Action::DragAndDrop {
                drag_template: drag.clone(),
                drop_template: drop.clone(),
            }),
            None => warn!("{} has no drop{} partner, skipping", drag.display(), suffix),
        }
    }
    Ok(actions)
}
