//! The depth-first discovery loop with backtracking-by-replay.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;

use crate::library::StateLibrary;
use crate::oracle::VisualOracle;
use crate::process::{ProcessConfig, ProcessControl, ProcessError, ResetPolicy, TargetProcess};
use uimap_graph::{Action, Graph, StateId};

/// Errors from the exploration engine.
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to persist graph: {0}")]
    GraphIo(#[from] uimap_graph::GraphIoError),

    #[error("failed to serialize summary: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration for an exploration session.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Path to the target executable.
    pub executable: PathBuf,
    /// Root of the template library (one directory per anticipated state).
    pub images_root: PathBuf,
    /// How long to wait after launching the target before driving it.
    pub startup_delay: Duration,
    /// Settle time after each performed action before recognition.
    pub transition_delay: Duration,
    /// Timeout for one oracle attempt.
    pub timeout: Duration,
    /// Grace period between termination request and forced kill.
    pub stop_grace: Duration,
    /// Similarity threshold of the first recognition/action attempt.
    pub initial_similarity: f64,
    /// Lowest similarity the sweep may relax to.
    pub min_similarity: f64,
    /// Amount the similarity drops per recognition level / retry.
    pub similarity_step: f64,
    /// Attempts per action before it is skipped.
    pub retries: u32,
    /// State reset applied before each relaunch.
    pub reset_policy: ResetPolicy,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::new(),
            images_root: PathBuf::new(),
            startup_delay: Duration::from_secs(5),
            transition_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(2),
            stop_grace: Duration::from_secs(5),
            initial_similarity: 0.99,
            min_similarity: 0.85,
            similarity_step: 0.01,
            retries: 6,
            reset_policy: ResetPolicy::None,
        }
    }
}

impl ExplorerConfig {
    /// Check the configuration; failures here are fatal at startup.
    fn validate(&self) -> Result<(), ExploreError> {
        if !(0.0..=1.0).contains(&self.initial_similarity)
            || !(0.0..=1.0).contains(&self.min_similarity)
        {
            return Err(ExploreError::Config(
                "similarity thresholds must lie in 0.0..=1.0".to_owned(),
            ));
        }
        if self.min_similarity > self.initial_similarity {
            return Err(ExploreError::Config(
                "min_similarity exceeds initial_similarity".to_owned(),
            ));
        }
        if self.similarity_step <= 0.0 {
            return Err(ExploreError::Config(
                "similarity_step must be positive".to_owned(),
            ));
        }
        if self.retries == 0 {
            return Err(ExploreError::Config("retries must be at least 1".to_owned()));
        }
        if let ResetPolicy::ExternalReset { script } = &self.reset_policy {
            if !script.is_file() {
                return Err(ExploreError::Config(format!(
                    "external reset script {} does not exist",
                    script.display()
                )));
            }
        }
        Ok(())
    }

    fn process_config(&self) -> ProcessConfig {
        ProcessConfig {
            executable: self.executable.clone(),
            startup_delay: self.startup_delay,
            stop_grace: self.stop_grace,
            reset_policy: self.reset_policy.clone(),
        }
    }
}

/// Counters describing one exploration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExplorationStats {
    /// States in the generated graph, phantoms included.
    pub states_discovered: usize,
    /// Phantom states synthesized for unclassifiable screens.
    pub phantom_states: usize,
    /// Transitions recorded in the generated graph.
    pub transitions_recorded: usize,
    /// Actions performed successfully during discovery (replays excluded).
    pub actions_performed: usize,
    /// Actions skipped because the oracle could not perform them.
    pub actions_failed: usize,
    /// Recovery cycles (restart + replay).
    pub recoveries: usize,
    /// Path steps successfully re-driven during recoveries.
    pub replayed_steps: usize,
    /// Path steps that failed during replay (logged, not fatal).
    pub failed_replays: usize,
    /// Times the target process was launched, initial launch included.
    pub process_launches: usize,
}

/// The state-space discovery engine.
///
/// Owns the graph it is building for the duration of one run; nothing else
/// reads it until the run completes.
pub struct Explorer {
    config: ExplorerConfig,
    library: StateLibrary,
    oracle: Box<dyn VisualOracle>,
    process: Box<dyn ProcessControl>,
    graph: Graph,
    visited: BTreeSet<String>,
    phantom_counter: u32,
    stats: ExplorationStats,
}

impl Explorer {
    /// Create an explorer driving a real [`TargetProcess`].
    pub fn new(config: ExplorerConfig, oracle: Box<dyn VisualOracle>) -> Result<Self, ExploreError> {
        let process = Box::new(TargetProcess::new(config.process_config()));
        Self::with_process(config, oracle, process)
    }

    /// Create an explorer with explicit process control (tests, embedding).
    pub fn with_process(
        config: ExplorerConfig,
        oracle: Box<dyn VisualOracle>,
        process: Box<dyn ProcessControl>,
    ) -> Result<Self, ExploreError> {
        config.validate()?;
        let library = StateLibrary::scan(&config.images_root)?;
        Ok(Self {
            config,
            library,
            oracle,
            process,
            graph: Graph::new(),
            visited: BTreeSet::new(),
            phantom_counter: 0,
            stats: ExplorationStats::default(),
        })
    }

    /// Run the full discovery loop and return the session counters.
    ///
    /// The generated graph stays owned by the explorer; read it with
    /// [`graph`](Self::graph) or take it with [`into_graph`](Self::into_graph).
    pub fn run(&mut self) -> Result<ExplorationStats, ExploreError> {
        if self.library.is_empty() {
            warn!(
                "template library {} holds no states, nothing to explore",
                self.library.root().display()
            );
            return Ok(self.stats.clone());
        }

        info!(
            "exploring {} against {} known states",
            self.config.executable.display(),
            self.library.len()
        );
        self.process.ensure_running()?;
        self.stats.process_launches += 1;

        let mut path = Vec::new();
        match self.recognize() {
            Some(idx) => {
                let (name, template) = {
                    let entry = &self.library.states()[idx];
                    (entry.name.clone(), entry.template.clone())
                };
                let id = self.graph.add_state_with_template(&name, template);
                let _ = self.graph.set_start(id);
                self.dfs(idx, &mut path)?;
            }
            None => {
                warn!("initial screen matches no known state");
                let id = self.synthesize_phantom();
                let _ = self.graph.set_start(id);
            }
        }

        self.process.shutdown()?;
        self.stats.states_discovered = self.graph.len();
        self.stats.transitions_recorded = self.graph.transition_count();
        info!(
            "exploration finished: {} states ({} phantom), {} transitions",
            self.stats.states_discovered, self.stats.phantom_states, self.stats.transitions_recorded
        );
        Ok(self.stats.clone())
    }

    /// The graph built so far.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Consume the explorer, yielding the generated graph.
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Counters for the run so far.
    pub fn stats(&self) -> &ExplorationStats {
        &self.stats
    }

    /// Persist the run's artifacts into `dir`: the generated graph in the
    /// line format, the formatted report, and a JSON summary of the
    /// counters.
    pub fn save_artifacts(&self, dir: &std::path::Path) -> Result<(), ExploreError> {
        std::fs::create_dir_all(dir)?;
        uimap_graph::save(
            &self.config.images_root,
            &dir.join("generated_graph.txt"),
            &self.graph,
        )?;
        std::fs::write(
            dir.join("report.txt"),
            crate::report::format_report(&self.stats, &self.graph),
        )?;
        std::fs::write(
            dir.join("summary.json"),
            serde_json::to_string_pretty(&self.stats)?,
        )?;
        info!("artifacts saved to {}", dir.display());
        Ok(())
    }

    /// Visit one unvisited state: perform each of its action templates in
    /// turn, recursing into whatever each one leads to.
    ///
    /// Push/pop discipline: every successful action pushes exactly one
    /// entry onto `path` and the recovery that follows its branch pops it,
    /// so on return the environment is back at this state's parent.
    fn dfs(&mut self, lib_idx: usize, path: &mut Vec<Action>) -> Result<(), ExploreError> {
        let (name, template, group) = {
            let entry = &self.library.states()[lib_idx];
            (
                entry.name.clone(),
                entry.template.clone(),
                entry.actions.clone(),
            )
        };
        let state_id = self.graph.add_state_with_template(&name, template);
        self.visited.insert(name.clone());
        info!("visiting state `{name}`");

        let Some(group) = group else {
            debug!("state `{name}` has no action templates, leaf reached");
            return Ok(());
        };
        let kind = group.kind;

        for action in group.actions {
            debug!("trying {} via {}", kind, action.template().display());
            if !self.try_action(&action) {
                warn!(
                    "could not perform {} via {}, skipping",
                    kind,
                    action.template().display()
                );
                self.stats.actions_failed += 1;
                continue;
            }
            self.stats.actions_performed += 1;
            path.push(action.clone());
            thread::sleep(self.config.transition_delay);

            match self.recognize() {
                Some(dst_idx) => {
                    let (dst_name, dst_template) = {
                        let dst = &self.library.states()[dst_idx];
                        (dst.name.clone(), dst.template.clone())
                    };
                    let dst_id = self.graph.add_state_with_template(&dst_name, dst_template);
                    debug!("`{name}` --{kind}--> `{dst_name}`");
                    if let Err(e) = self.graph.add_transition(state_id, dst_id, action.clone()) {
                        warn!("could not record transition: {e}");
                    }
                    if self.visited.contains(&dst_name) {
                        debug!("state `{dst_name}` already visited, closing branch");
                    } else {
                        self.dfs(dst_idx, path)?;
                    }
                    self.recover(path)?;
                }
                None => {
                    self.synthesize_phantom();
                    self.recover(path)?;
                }
            }
        }
        Ok(())
    }

    /// Sweep the similarity threshold from initial down to minimum, testing
    /// every library template at each level. The first match (in directory
    /// enumeration order) wins.
    fn recognize(&mut self) -> Option<usize> {
        let mut similarity = self.config.initial_similarity;
        loop {
            debug!("recognizing current screen at similarity {similarity:.2}");
            for idx in 0..self.library.len() {
                let template = self.library.states()[idx].template.clone();
                if self
                    .oracle
                    .search_once(&template, similarity, self.config.timeout)
                {
                    debug!("screen matches `{}`", self.library.states()[idx].name);
                    return Some(idx);
                }
            }
            if similarity <= self.config.min_similarity {
                return None;
            }
            similarity =
                (similarity - self.config.similarity_step).max(self.config.min_similarity);
        }
    }

    /// Perform one action with the bounded retry loop, relaxing similarity
    /// per attempt down to the configured minimum.
    fn try_action(&mut self, action: &Action) -> bool {
        for attempt in 0..self.config.retries {
            let similarity = (self.config.initial_similarity
                - f64::from(attempt) * self.config.similarity_step)
                .max(self.config.min_similarity);
            if self.perform_once(action, similarity) {
                return true;
            }
            debug!(
                "attempt {}/{} on {} failed",
                attempt + 1,
                self.config.retries,
                action.template().display()
            );
        }
        false
    }

    fn perform_once(&mut self, action: &Action, similarity: f64) -> bool {
        let timeout = self.config.timeout;
        match action {
            Action::Click { template } => self.oracle.click_once(template, similarity, timeout),
            Action::DoubleClick { template } => {
                self.oracle.double_click_once(template, similarity, timeout)
            }
            Action::ClickAndType { template, text } => {
                self.oracle.type_text(template, text, similarity, timeout, false)
            }
            Action::DragAndDrop {
                drag_template,
                drop_template,
            } => self
                .oracle
                .drag_drop(drag_template, drop_template, similarity, timeout),
        }
    }

    /// Synthesize a phantom state for a screen no template matched: capture
    /// a screenshot into its own directory under the images root and add
    /// the state to the graph. No transition is recorded into a phantom.
    fn synthesize_phantom(&mut self) -> StateId {
        let name = format!("phantom_state{}", self.phantom_counter);
        self.phantom_counter += 1;
        warn!("screen matches no known state, synthesizing `{name}`");

        let dir = self.library.root().join(&name);
        let template = match self.oracle.capture_screenshot(&name, &dir) {
            Ok(path) => path,
            Err(e) => {
                warn!("failed to capture screenshot for `{name}`: {e}");
                dir.join(format!("{name}.png"))
            }
        };
        self.stats.phantom_states += 1;
        self.graph.add_phantom_state(&name, template)
    }

    /// Backtrack by replay: restart the environment and re-drive the
    /// recorded path, minus its last entry, to return to the decision point
    /// before the action just tried.
    fn recover(&mut self, path: &mut Vec<Action>) -> Result<(), ExploreError> {
        let dropped = path.pop();
        debug!(
            "recovery: dropping {}, replaying {} steps",
            dropped
                .as_ref()
                .map_or_else(|| "nothing".to_owned(), |a| a.template().display().to_string()),
            path.len()
        );
        self.stats.recoveries += 1;
        self.process.relaunch()?;
        self.stats.process_launches += 1;

        for action in path.clone() {
            if self.try_action(&action) {
                self.stats.replayed_steps += 1;
            } else {
                warn!(
                    "replay step via {} failed, continuing",
                    action.template().display()
                );
                self.stats.failed_replays += 1;
            }
            thread::sleep(self.config.transition_delay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{ScreenHandle, ScriptedOracle};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Process double: relaunching puts the scripted screen back on the
    /// initial one, the way restarting a real application does.
    struct FakeProcess {
        screen: ScreenHandle,
        initial: PathBuf,
        launches: Arc<AtomicUsize>,
    }

    impl ProcessControl for FakeProcess {
        fn ensure_running(&mut self) -> Result<(), ProcessError> {
            *self.screen.lock().unwrap() = self.initial.clone();
            self.launches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn relaunch(&mut self) -> Result<(), ProcessError> {
            self.ensure_running()
        }

        fn shutdown(&mut self) -> Result<(), ProcessError> {
            Ok(())
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn quick_config(images_root: PathBuf) -> ExplorerConfig {
        ExplorerConfig {
            executable: PathBuf::from("target-app"),
            images_root,
            startup_delay: Duration::ZERO,
            transition_delay: Duration::ZERO,
            timeout: Duration::ZERO,
            stop_grace: Duration::ZERO,
            retries: 2,
            ..Default::default()
        }
    }

    fn explorer_with(
        root: &Path,
        oracle: ScriptedOracle,
        initial_screen: &Path,
    ) -> (Explorer, Arc<AtomicUsize>) {
        let launches = Arc::new(AtomicUsize::new(0));
        let process = FakeProcess {
            screen: oracle.screen_handle(),
            initial: initial_screen.to_owned(),
            launches: Arc::clone(&launches),
        };
        let explorer = Explorer::with_process(
            quick_config(root.to_owned()),
            Box::new(oracle),
            Box::new(process),
        )
        .unwrap();
        (explorer, launches)
    }

    #[test]
    fn test_discovers_three_state_machine() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let menu = root.join("menu/menu.png");
        let play = root.join("play/play.png");
        let end = root.join("end/end.png");
        let to_play = root.join("menu/buttons/click/to_play.png");
        let to_end = root.join("menu/buttons/click/to_end.png");
        let looper = root.join("play/buttons/click/looper.png");
        for p in [&menu, &play, &end, &to_play, &to_end, &looper] {
            touch(p);
        }

        let oracle = ScriptedOracle::new(&menu)
            .rule(&menu, &to_play, &play)
            .rule(&menu, &to_end, &end)
            .rule(&play, &looper, &play);

        let (mut explorer, launches) = explorer_with(root, oracle, &menu);
        let stats = explorer.run().unwrap();

        let graph = explorer.graph();
        assert_eq!(graph.len(), 3);
        assert_eq!(graph.transition_count(), 3);
        assert_eq!(stats.phantom_states, 0);

        let menu_id = graph.find_state_by_name("menu").unwrap();
        let play_id = graph.find_state_by_name("play").unwrap();
        let end_id = graph.find_state_by_name("end").unwrap();
        assert_eq!(graph.start(), Some(menu_id));

        // menu reaches both play and end; play self-loops.
        let menu_targets: BTreeSet<_> =
            graph[menu_id].transitions().iter().map(|t| t.target).collect();
        assert_eq!(menu_targets, BTreeSet::from([play_id, end_id]));
        assert_eq!(graph[play_id].transitions().len(), 1);
        assert_eq!(graph[play_id].transitions()[0].target, play_id);
        assert!(graph[end_id].transitions().is_empty());

        // One launch up front, one per recovery: closing play's self-loop,
        // returning from play, returning from end.
        assert_eq!(stats.actions_performed, 3);
        assert_eq!(stats.actions_failed, 0);
        assert_eq!(stats.recoveries, 3);
        assert_eq!(stats.process_launches, 4);
        assert_eq!(launches.load(Ordering::SeqCst), 4);
        // The only non-empty replay re-drives the step into menu's first
        // branch.
        assert_eq!(stats.replayed_steps, 1);
        assert_eq!(stats.failed_replays, 0);
    }

    #[test]
    fn test_unclassifiable_screen_becomes_phantom() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let menu = root.join("menu/menu.png");
        let mystery = root.join("menu/buttons/click/mystery.png");
        touch(&menu);
        touch(&mystery);

        // The button leads somewhere no template describes.
        let oracle = ScriptedOracle::new(&menu).rule(&menu, &mystery, "weird-screen.png");

        let (mut explorer, _) = explorer_with(root, oracle, &menu);
        let stats = explorer.run().unwrap();

        assert_eq!(stats.phantom_states, 1);
        let graph = explorer.graph();
        assert_eq!(graph.len(), 2);
        // No transition is recorded into a phantom.
        assert_eq!(graph.transition_count(), 0);

        let phantom = graph.find_state_by_name("phantom_state0").unwrap();
        assert!(graph[phantom].is_phantom());
        // The screenshot landed in its own directory under the images root.
        assert!(graph[phantom].template().starts_with(root));
        assert!(graph[phantom].template().is_file());
    }

    #[test]
    fn test_failed_action_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let menu = root.join("menu/menu.png");
        let end = root.join("end/end.png");
        let broken = root.join("menu/buttons/click/broken.png");
        let works = root.join("menu/buttons/click/works.png");
        for p in [&menu, &end, &broken, &works] {
            touch(p);
        }

        let oracle = ScriptedOracle::new(&menu)
            .failing(&broken)
            .rule(&menu, &works, &end);

        let (mut explorer, _) = explorer_with(root, oracle, &menu);
        let stats = explorer.run().unwrap();

        assert_eq!(stats.actions_failed, 1);
        assert_eq!(stats.actions_performed, 1);
        let graph = explorer.graph();
        assert_eq!(graph.transition_count(), 1);
        let menu_id = graph.find_state_by_name("menu").unwrap();
        assert_eq!(
            graph[menu_id].transitions()[0].action.template(),
            works.as_path()
        );
    }

    #[test]
    fn test_unrecognized_initial_screen_becomes_phantom_start() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("menu/menu.png"));

        let oracle = ScriptedOracle::new("splash.png");
        let initial = PathBuf::from("splash.png");
        let (mut explorer, _) = explorer_with(root, oracle, &initial);
        let stats = explorer.run().unwrap();

        assert_eq!(stats.phantom_states, 1);
        assert_eq!(stats.states_discovered, 1);
        let graph = explorer.graph();
        let start = graph.start().unwrap();
        assert!(graph[start].is_phantom());
    }

    #[test]
    fn test_empty_library_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::new("menu.png");
        let (mut explorer, launches) = explorer_with(dir.path(), oracle, Path::new("menu.png"));
        let stats = explorer.run().unwrap();

        assert_eq!(stats.states_discovered, 0);
        assert_eq!(stats.process_launches, 0);
        assert_eq!(launches.load(Ordering::SeqCst), 0);
        assert!(explorer.graph().is_empty());
    }

    #[test]
    fn test_external_reset_without_script_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick_config(dir.path().to_owned());
        config.reset_policy = ResetPolicy::ExternalReset {
            script: PathBuf::from("/nonexistent/reset.sh"),
        };

        let oracle = ScriptedOracle::new("menu.png");
        match Explorer::new(config, Box::new(oracle)).err() {
            Some(ExploreError::Config(_)) => {}
            other => panic!("expected configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_save_artifacts_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("imgs");
        let menu = root.join("menu/menu.png");
        let end = root.join("end/end.png");
        let go = root.join("menu/buttons/click/go.png");
        for p in [&menu, &end, &go] {
            touch(p);
        }

        let oracle = ScriptedOracle::new(&menu).rule(&menu, &go, &end);
        let (mut explorer, _) = explorer_with(&root, oracle, &menu);
        explorer.run().unwrap();

        let out = dir.path().join("results");
        explorer.save_artifacts(&out).unwrap();

        assert!(out.join("report.txt").is_file());
        assert!(out.join("summary.json").is_file());
        let reloaded = uimap_graph::load(&out.join("generated_graph.txt"), &root).unwrap();
        assert_eq!(reloaded.len(), explorer.graph().len());
        assert_eq!(
            reloaded.transition_count(),
            explorer.graph().transition_count()
        );
    }

    #[test]
    fn test_invalid_similarity_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quick_config(dir.path().to_owned());
        config.min_similarity = 0.99;
        config.initial_similarity = 0.5;

        let oracle = ScriptedOracle::new("menu.png");
        assert!(matches!(
            Explorer::new(config, Box::new(oracle)),
            Err(ExploreError::Config(_))
        ));
    }
}
