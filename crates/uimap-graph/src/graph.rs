//! The screen-state graph: states, typed actions, transitions.

use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};

use log::{debug, info};
use thiserror::Error;

/// Errors from graph mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The given id does not name a state of this graph.
    #[error("no state with id {0} in this graph")]
    UnknownState(StateId),

    /// A state with this name already exists.
    #[error("a state named `{0}` already exists")]
    DuplicateName(String),
}

/// Index of a state within its [`Graph`].
///
/// Ids are positional: [`Graph::remove_state`] shifts every later id down by
/// one, so ids handed out before a removal must not be reused afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of user action a transition performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionKind {
    Click,
    DoubleClick,
    ClickAndType,
    DragAndDrop,
}

impl ActionKind {
    /// All kinds, in the order action groups are probed for a state.
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Click,
        ActionKind::DoubleClick,
        ActionKind::ClickAndType,
        ActionKind::DragAndDrop,
    ];

    /// The keyword written on `e` lines of the graph file format.
    pub fn keyword(self) -> &'static str {
        match self {
            ActionKind::Click => "CLICK",
            ActionKind::DoubleClick => "DOUBLE_CLICK",
            ActionKind::ClickAndType => "CLICK_AND_TYPE",
            ActionKind::DragAndDrop => "DRAG_AND_DROP",
        }
    }

    /// Inverse of [`keyword`](Self::keyword).
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "CLICK" => Some(ActionKind::Click),
            "DOUBLE_CLICK" => Some(ActionKind::DoubleClick),
            "CLICK_AND_TYPE" => Some(ActionKind::ClickAndType),
            "DRAG_AND_DROP" => Some(ActionKind::DragAndDrop),
            _ => None,
        }
    }

    /// Directory name of this kind's action-template group in a state
    /// library (`buttons/<dir_name>/`).
    pub fn dir_name(self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::DoubleClick => "double_click",
            ActionKind::ClickAndType => "click_and_type",
            ActionKind::DragAndDrop => "drag_and_drop",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One user action, carrying exactly the payload its kind requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Click the on-screen control matching `template`.
    Click { template: PathBuf },
    /// Double-click the on-screen control matching `template`.
    DoubleClick { template: PathBuf },
    /// Click the control matching `template`, then type `text` into it.
    ClickAndType { template: PathBuf, text: String },
    /// Drag the control matching `drag_template` onto the one matching
    /// `drop_template`.
    DragAndDrop {
        drag_template: PathBuf,
        drop_template: PathBuf,
    },
}

impl Action {
    /// The kind of this action.
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Click { .. } => ActionKind::Click,
            Action::DoubleClick { .. } => ActionKind::DoubleClick,
            Action::ClickAndType { .. } => ActionKind::ClickAndType,
            Action::DragAndDrop { .. } => ActionKind::DragAndDrop,
        }
    }

    /// The primary template: the control acted on. For drag-and-drop this is
    /// the drag source.
    pub fn template(&self) -> &Path {
        match self {
            Action::Click { template }
            | Action::DoubleClick { template }
            | Action::ClickAndType { template, .. } => template,
            Action::DragAndDrop { drag_template, .. } => drag_template,
        }
    }
}

/// A directed edge: perform `action`, end up in `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub action: Action,
    pub target: StateId,
}

/// A recognizable screen of the target application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    name: String,
    template: PathBuf,
    phantom: bool,
    transitions: Vec<Transition>,
}

impl State {
    fn new(name: String, template: PathBuf, phantom: bool) -> Self {
        Self {
            name,
            template,
            phantom,
            transitions: Vec::new(),
        }
    }

    /// The state's name, unique within its graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The image used to recognize this state on screen. Empty if the state
    /// was created without one.
    pub fn template(&self) -> &Path {
        &self.template
    }

    /// Whether this state was synthesized for a screen the oracle could not
    /// classify.
    pub fn is_phantom(&self) -> bool {
        self.phantom
    }

    /// Outgoing transitions, in discovery/authoring order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

/// An insertion-ordered collection of states with an optional designated
/// start state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    states: Vec<State>,
    start: Option<StateId>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state with the given name and no template.
    ///
    /// Idempotent by name: if a state with this name already exists, its id
    /// is returned and the graph is unchanged.
    pub fn add_state(&mut self, name: &str) -> StateId {
        self.insert(name, PathBuf::new(), false)
    }

    /// Add a state with the given name and recognition template.
    ///
    /// Idempotent by name; a duplicate call leaves the existing state's
    /// template untouched.
    pub fn add_state_with_template(&mut self, name: &str, template: impl Into<PathBuf>) -> StateId {
        self.insert(name, template.into(), false)
    }

    /// Add a phantom state: an auto-generated placeholder for a screen that
    /// could not be classified, carrying a fresh screenshot as its template.
    pub fn add_phantom_state(&mut self, name: &str, screenshot: impl Into<PathBuf>) -> StateId {
        self.insert(name, screenshot.into(), true)
    }

    fn insert(&mut self, name: &str, template: PathBuf, phantom: bool) -> StateId {
        if let Some(existing) = self.find_state_by_name(name) {
            debug!("state `{name}` already exists, returning {existing}");
            return existing;
        }
        let id = StateId(self.states.len());
        self.states.push(State::new(name.to_owned(), template, phantom));
        id
    }

    /// Record a transition from `src` to `dst`.
    ///
    /// Fails, leaving the graph unchanged, if either endpoint is not a
    /// member of this graph.
    pub fn add_transition(
        &mut self,
        src: StateId,
        dst: StateId,
        action: Action,
    ) -> Result<(), GraphError> {
        self.check_member(src)?;
        self.check_member(dst)?;
        self.states[src.0].transitions.push(Transition { action, target: dst });
        Ok(())
    }

    /// Remove a state, stripping every transition whose destination is that
    /// state from every remaining state.
    ///
    /// Ids issued for later states shift down by one.
    pub fn remove_state(&mut self, id: StateId) -> Result<(), GraphError> {
        self.check_member(id)?;
        info!("removing state `{}`", self.states[id.0].name);
        self.states.remove(id.0);
        for state in &mut self.states {
            state.transitions.retain(|t| t.target != id);
            for t in &mut state.transitions {
                if t.target.0 > id.0 {
                    t.target.0 -= 1;
                }
            }
        }
        self.start = match self.start {
            Some(s) if s == id => None,
            Some(s) if s.0 > id.0 => Some(StateId(s.0 - 1)),
            other => other,
        };
        Ok(())
    }

    /// Remove the first transition from `src` whose destination is `dst`.
    ///
    /// Returns whether a transition was removed.
    pub fn remove_transition_to(&mut self, src: StateId, dst: StateId) -> Result<bool, GraphError> {
        self.check_member(src)?;
        self.check_member(dst)?;
        let transitions = &mut self.states[src.0].transitions;
        match transitions.iter().position(|t| t.target == dst) {
            Some(pos) => {
                transitions.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Rename a state, keeping its transitions and inbound references valid.
    pub fn rename_state(&mut self, id: StateId, new_name: &str) -> Result<(), GraphError> {
        self.check_member(id)?;
        if self
            .find_state_by_name(new_name)
            .is_some_and(|other| other != id)
        {
            return Err(GraphError::DuplicateName(new_name.to_owned()));
        }
        self.states[id.0].name = new_name.to_owned();
        Ok(())
    }

    /// Designate the start state. Fails if `id` is not a member.
    pub fn set_start(&mut self, id: StateId) -> Result<(), GraphError> {
        self.check_member(id)?;
        self.start = Some(id);
        Ok(())
    }

    /// The designated start state, if any.
    pub fn start(&self) -> Option<StateId> {
        self.start
    }

    /// Look up a state by id.
    pub fn state(&self, id: StateId) -> Option<&State> {
        self.states.get(id.0)
    }

    /// Iterate states in insertion order.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> {
        self.states.iter().enumerate().map(|(i, s)| (StateId(i), s))
    }

    /// Find a state by its unique name.
    pub fn find_state_by_name(&self, name: &str) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| s.name == name)
            .map(StateId)
    }

    /// Find a state by its recognition template.
    pub fn find_state_by_template(&self, template: &Path) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| s.template == template)
            .map(StateId)
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the graph has no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Total number of transitions across all states.
    pub fn transition_count(&self) -> usize {
        self.states.iter().map(|s| s.transitions.len()).sum()
    }

    /// Drop all states and transitions.
    pub fn clear(&mut self) {
        self.states.clear();
        self.start = None;
    }

    fn check_member(&self, id: StateId) -> Result<(), GraphError> {
        if id.0 < self.states.len() {
            Ok(())
        } else {
            Err(GraphError::UnknownState(id))
        }
    }
}

impl Index<StateId> for Graph {
    type Output = State;

    fn index(&self, id: StateId) -> &State {
        &self.states[id.0]
    }
}
