//! Task port - the environment an agent acts in
//!
//! A task is a fixed sequence of trials. Each trial places the agent in one
//! context with its own start, goal, walls and key-press mapping; the trial
//! ends when the goal is reached and the next one begins immediately.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    Result,
    planner::TransitionModel,
    types::{ContextId, Experience, Location, Observation, StateIndex},
};

/// A barrier on one side of a cell.
///
/// Moving from `location` in `direction` (an abstract action index) leaves
/// the agent where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wall {
    pub location: Location,
    pub direction: usize,
}

/// Static description of one trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub context: ContextId,
    pub start: Location,
    pub goal: Location,
    /// Key press → abstract action (direction).
    pub action_map: BTreeMap<usize, usize>,
    #[serde(default)]
    pub walls: Vec<Wall>,
}

/// Environment driven by [`crate::agent::Agent`].
///
/// # Examples
///
/// ```
/// use tasksets::{adapters::GridWorld, ports::Task};
///
/// let mut task = GridWorld::demo().unwrap();
/// let first = task.observe().unwrap();
/// let experience = task.step(0).unwrap();
/// assert_eq!(experience.start, first);
/// ```
pub trait Task {
    /// Current position and context, or `None` once every trial is done.
    fn observe(&self) -> Option<Observation>;

    /// Press `primitive` and report what happened.
    ///
    /// # Errors
    ///
    /// [`crate::Error::TaskExhausted`] after the final trial and
    /// [`crate::Error::InvalidAction`] for an unknown key.
    fn step(&mut self, primitive: usize) -> Result<Experience>;

    /// Static data of the active trial.
    fn trial(&self) -> Result<&TrialSpec>;

    /// Index of the active trial (equals `n_trials()` once exhausted).
    fn trial_number(&self) -> usize;

    fn n_trials(&self) -> usize;

    /// Number of distinct contexts across all trials.
    fn n_contexts(&self) -> usize;

    fn n_states(&self) -> usize;

    /// State index of a grid cell.
    ///
    /// # Errors
    ///
    /// [`crate::Error::UnknownLocation`] for a cell outside the grid.
    fn state_of(&self, location: Location) -> Result<StateIndex>;

    fn n_primitive_actions(&self) -> usize;

    fn n_abstract_actions(&self) -> usize;

    /// Transition model of the active trial, indexed by abstract action.
    fn transitions(&self) -> Result<&TransitionModel>;

    /// Word for a direction, e.g. `"left"`.
    fn abstract_action_label(&self, abstract_action: usize) -> &str;
}
