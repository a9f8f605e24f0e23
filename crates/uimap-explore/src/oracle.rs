//! Visual-recognition oracle capability.
//!
//! The exploration engine consumes screen recognition and input injection
//! through [`VisualOracle`]; production wiring binds the trait to a
//! screen-automation backend, tests and dry-runs use [`ScriptedOracle`].
//!
//! Every call is a blocking single attempt, parameterized by a similarity
//! threshold (0.0–1.0) and a timeout for that one attempt. Retry and
//! stepwise similarity relaxation are the caller's responsibility.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;

/// Blocking, single-attempt visual automation calls.
pub trait VisualOracle {
    /// Whether the control or screen matching `template` is currently
    /// visible.
    fn search_once(&mut self, template: &Path, similarity: f64, timeout: Duration) -> bool;

    /// Click the control matching `template`. Returns whether the click was
    /// performed.
    fn click_once(&mut self, template: &Path, similarity: f64, timeout: Duration) -> bool;

    /// Double-click the control matching `template`.
    fn double_click_once(&mut self, template: &Path, similarity: f64, timeout: Duration) -> bool;

    /// Click the control matching `template` and type `text` into it,
    /// optionally clearing the field first.
    fn type_text(
        &mut self,
        template: &Path,
        text: &str,
        similarity: f64,
        timeout: Duration,
        clear_before_typing: bool,
    ) -> bool;

    /// Drag the control matching `source` onto the one matching `target`.
    fn drag_drop(&mut self, source: &Path, target: &Path, similarity: f64, timeout: Duration)
        -> bool;

    /// Capture the current screen into `directory`, returning the saved
    /// file's path.
    fn capture_screenshot(&mut self, name: &str, directory: &Path) -> io::Result<PathBuf>;
}

/// Shared handle to the simulated screen of a [`ScriptedOracle`].
///
/// A test double standing in for the target process holds a clone of this
/// and resets it to the initial screen on relaunch, the way a real restart
/// puts a real application back on its first screen.
pub type ScreenHandle = Arc<Mutex<PathBuf>>;

/// Deterministic in-memory oracle double.
///
/// Models the target application as a set of screens identified by their
/// recognition template: `search_once` matches a template iff it names the
/// current screen, and an action on a control template moves to the screen
/// a rule maps it to. Controls with no rule for the current screen fail,
/// as do controls registered as failing outright.
pub struct ScriptedOracle {
    screen: ScreenHandle,
    /// (current screen template, control template) -> next screen template.
    rules: BTreeMap<(PathBuf, PathBuf), PathBuf>,
    failing: BTreeSet<PathBuf>,
    performed: Vec<PathBuf>,
    captures: usize,
}

impl ScriptedOracle {
    /// Create an oracle whose screen starts at `initial`.
    pub fn new(initial: impl Into<PathBuf>) -> Self {
        Self {
            screen: Arc::new(Mutex::new(initial.into())),
            rules: BTreeMap::new(),
            failing: BTreeSet::new(),
            performed: Vec::new(),
            captures: 0,
        }
    }

    /// Register that acting on `control` while `screen` is shown moves to
    /// `next`.
    pub fn rule(
        mut self,
        screen: impl Into<PathBuf>,
        control: impl Into<PathBuf>,
        next: impl Into<PathBuf>,
    ) -> Self {
        self.rules
            .insert((screen.into(), control.into()), next.into());
        self
    }

    /// Register a control the oracle always fails to act on.
    pub fn failing(mut self, control: impl Into<PathBuf>) -> Self {
        self.failing.insert(control.into());
        self
    }

    /// Handle to the simulated screen, for process doubles.
    pub fn screen_handle(&self) -> ScreenHandle {
        Arc::clone(&self.screen)
    }

    /// Primary templates of every successfully performed action, in order.
    /// Replayed actions appear again.
    pub fn performed(&self) -> &[PathBuf] {
        &self.performed
    }

    fn act(&mut self, control: &Path) -> bool {
        if self.failing.contains(control) {
            return false;
        }
        let mut screen = self.screen.lock().unwrap();
        let key = (screen.clone(), control.to_path_buf());
        match self.rules.get(&key) {
            Some(next) => {
                debug!(
                    "scripted: {} on {} -> {}",
                    control.display(),
                    screen.display(),
                    next.display()
                );
                *screen = next.clone();
                drop(screen);
                self.performed.push(control.to_path_buf());
                true
            }
            None => false,
        }
    }
}

impl VisualOracle for ScriptedOracle {
    fn search_once(&mut self, template: &Path, _similarity: f64, _timeout: Duration) -> bool {
        *self.screen.lock().unwrap() == template
    }

    fn click_once(&mut self, template: &Path, _similarity: f64, _timeout: Duration) -> bool {
        self.act(template)
    }

    fn double_click_once(&mut self, template: &Path, _similarity: f64, _timeout: Duration) -> bool {
        self.act(template)
    }

    fn type_text(
        &mut self,
        template: &Path,
        _text: &str,
        _similarity: f64,
        _timeout: Duration,
        _clear_before_typing: bool,
    ) -> bool {
        self.act(template)
    }

    fn drag_drop(
        &mut self,
        source: &Path,
        _target: &Path,
        _similarity: f64,
        _timeout: Duration,
    ) -> bool {
        self.act(source)
    }

    fn capture_screenshot(&mut self, name: &str, directory: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(directory)?;
        let path = directory.join(format!("{name}.png"));
        fs::write(&path, b"")?;
        self.captures += 1;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(10);

    #[test]
    fn test_search_matches_current_screen_only() {
        let mut oracle = ScriptedOracle::new("menu.png");
        assert!(oracle.search_once(Path::new("menu.png"), 0.99, TIMEOUT));
        assert!(!oracle.search_once(Path::new("play.png"), 0.99, TIMEOUT));
    }

    #[test]
    fn test_click_follows_rule_and_moves_screen() {
        let mut oracle =
            ScriptedOracle::new("menu.png").rule("menu.png", "play_btn.png", "play.png");

        assert!(oracle.click_once(Path::new("play_btn.png"), 0.9, TIMEOUT));
        assert!(oracle.search_once(Path::new("play.png"), 0.9, TIMEOUT));
        assert_eq!(oracle.performed(), [PathBuf::from("play_btn.png")]);
    }

    #[test]
    fn test_click_without_rule_fails() {
        let mut oracle = ScriptedOracle::new("menu.png");
        assert!(!oracle.click_once(Path::new("nope.png"), 0.9, TIMEOUT));
        assert!(oracle.performed().is_empty());
    }

    #[test]
    fn test_failing_control_never_acts() {
        let mut oracle = ScriptedOracle::new("menu.png")
            .rule("menu.png", "broken.png", "anywhere.png")
            .failing("broken.png");
        assert!(!oracle.click_once(Path::new("broken.png"), 0.9, TIMEOUT));
        assert!(oracle.search_once(Path::new("menu.png"), 0.9, TIMEOUT));
    }

    #[test]
    fn test_screen_handle_reset_simulates_relaunch() {
        let mut oracle =
            ScriptedOracle::new("menu.png").rule("menu.png", "play_btn.png", "play.png");
        let screen = oracle.screen_handle();

        assert!(oracle.click_once(Path::new("play_btn.png"), 0.9, TIMEOUT));
        *screen.lock().unwrap() = PathBuf::from("menu.png");
        assert!(oracle.search_once(Path::new("menu.png"), 0.9, TIMEOUT));
    }

    #[test]
    fn test_capture_screenshot_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut oracle = ScriptedOracle::new("menu.png");
        let path = oracle
            .capture_screenshot("phantom_state0", dir.path())
            .unwrap();
        assert!(path.is_file());
        assert_eq!(path.file_name().unwrap(), "phantom_state0.png");
    }
}
