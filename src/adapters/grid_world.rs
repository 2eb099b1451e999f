//! Deterministic grid-world task.
//!
//! Cells are addressed by `(x, y)` with `0 <= x < width` and
//! `0 <= y < height`; the state index of a cell is `y * width + x`.
//! Directions follow [`displacement_to_abstract_action`]: right, left, up,
//! down. Moves off the grid or through a wall leave the agent in place.
//! Reaching the goal pays 1 and ends the trial.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    planner::TransitionModel,
    ports::{Task, TrialSpec, Wall},
    types::{Experience, Location, Observation, StateIndex},
    utils::displacement_to_abstract_action,
};

/// Direction names, indexed by abstract action.
pub const DIRECTION_LABELS: [&str; 4] = ["right", "left", "up", "down"];

const DIRECTION_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

fn default_primitive_actions() -> usize {
    8
}

fn default_max_steps() -> usize {
    1_000
}

/// JSON layout of a grid-world task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridWorldSpec {
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_primitive_actions")]
    pub n_primitive_actions: usize,
    /// A trial that has not reached its goal after this many steps ends anyway.
    #[serde(default = "default_max_steps")]
    pub max_steps_per_trial: usize,
    pub trials: Vec<TrialSpec>,
}

impl GridWorldSpec {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| Error::Io {
            operation: format!("open grid world {}", path.display()),
            source,
        })?;
        Ok(serde_json::from_reader(file)?)
    }

    /// Two alternating contexts that share a goal and a key mapping on a 6×6
    /// grid; context 0 also walls off the goal's left side.
    pub fn demo() -> Self {
        let action_map = paired_action_map([0, 1, 2, 3]);
        let starts = [(0, 0), (0, 5), (2, 1), (5, 0), (1, 3), (3, 0), (0, 2), (4, 1)];
        let trials = starts
            .iter()
            .enumerate()
            .map(|(idx, &start)| TrialSpec {
                context: idx % 2,
                start: start.into(),
                goal: Location::new(5, 5),
                action_map: action_map.clone(),
                walls: if idx % 2 == 0 {
                    vec![Wall {
                        location: Location::new(4, 5),
                        direction: 0,
                    }]
                } else {
                    Vec::new()
                },
            })
            .collect();
        Self {
            width: 6,
            height: 6,
            n_primitive_actions: 8,
            max_steps_per_trial: default_max_steps(),
            trials,
        }
    }
}

/// Action map with two keys per direction: keys `2i` and `2i + 1` move in
/// `directions[i]`.
pub fn paired_action_map(directions: [usize; 4]) -> BTreeMap<usize, usize> {
    directions
        .iter()
        .enumerate()
        .flat_map(|(i, &direction)| [(2 * i, direction), (2 * i + 1, direction)])
        .collect()
}

/// Runs the trials of a [`GridWorldSpec`] in order.
#[derive(Debug, Clone)]
pub struct GridWorld {
    spec: GridWorldSpec,
    models: Vec<TransitionModel>,
    n_contexts: usize,
    trial: usize,
    location: Location,
    steps_in_trial: usize,
}

impl GridWorld {
    /// Validate `spec` and build one transition model per trial.
    pub fn new(spec: GridWorldSpec) -> Result<Self> {
        if spec.width <= 0 || spec.height <= 0 {
            return Err(Error::config(format!(
                "grid must have positive size, got {}x{}",
                spec.width, spec.height
            )));
        }
        if spec.n_primitive_actions == 0 {
            return Err(Error::config("grid world needs at least one key"));
        }
        if spec.max_steps_per_trial == 0 {
            return Err(Error::config("max steps per trial must be positive"));
        }

        let mut models = Vec::with_capacity(spec.trials.len());
        for (idx, trial) in spec.trials.iter().enumerate() {
            Self::validate_trial(&spec, idx, trial)?;
            models.push(Self::transition_model(&spec, &trial.walls)?);
        }
        let n_contexts = spec
            .trials
            .iter()
            .map(|trial| trial.context + 1)
            .max()
            .unwrap_or(0);
        let location = spec.trials.first().map_or(Location::new(0, 0), |t| t.start);

        debug!(
            width = spec.width,
            height = spec.height,
            trials = spec.trials.len(),
            contexts = n_contexts,
            "built grid world"
        );
        Ok(Self {
            spec,
            models,
            n_contexts,
            trial: 0,
            location,
            steps_in_trial: 0,
        })
    }

    /// The built-in demo layout.
    pub fn demo() -> Result<Self> {
        Self::new(GridWorldSpec::demo())
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(GridWorldSpec::from_json_file(path)?)
    }

    fn contains(spec: &GridWorldSpec, location: Location) -> bool {
        (0..spec.width).contains(&location.x) && (0..spec.height).contains(&location.y)
    }

    fn validate_trial(spec: &GridWorldSpec, idx: usize, trial: &TrialSpec) -> Result<()> {
        for location in [trial.start, trial.goal] {
            if !Self::contains(spec, location) {
                return Err(Error::UnknownLocation {
                    x: location.x,
                    y: location.y,
                });
            }
        }
        if trial.start == trial.goal {
            return Err(Error::config(format!(
                "trial {idx} starts on its goal {}",
                trial.goal
            )));
        }
        let keys: BTreeSet<usize> = trial.action_map.keys().copied().collect();
        let expected: BTreeSet<usize> = (0..spec.n_primitive_actions).collect();
        if keys != expected {
            return Err(Error::config(format!(
                "trial {idx} must map every key 0..{}",
                spec.n_primitive_actions
            )));
        }
        if let Some(&direction) = trial
            .action_map
            .values()
            .find(|&&d| d >= DIRECTION_LABELS.len())
        {
            return Err(Error::InvalidAction {
                action: direction,
                limit: DIRECTION_LABELS.len(),
            });
        }
        for wall in &trial.walls {
            if !Self::contains(spec, wall.location) {
                return Err(Error::UnknownLocation {
                    x: wall.location.x,
                    y: wall.location.y,
                });
            }
            if wall.direction >= DIRECTION_LABELS.len() {
                return Err(Error::InvalidAction {
                    action: wall.direction,
                    limit: DIRECTION_LABELS.len(),
                });
            }
        }
        Ok(())
    }

    fn index_of(spec: &GridWorldSpec, location: Location) -> StateIndex {
        (location.y * spec.width + location.x) as StateIndex
    }

    fn location_of(spec: &GridWorldSpec, state: StateIndex) -> Location {
        let state = state as i32;
        Location::new(state % spec.width, state / spec.width)
    }

    fn successor(
        spec: &GridWorldSpec,
        walls: &[Wall],
        from: Location,
        direction: usize,
    ) -> Location {
        if walls
            .iter()
            .any(|wall| wall.location == from && wall.direction == direction)
        {
            return from;
        }
        let (dx, dy) = DIRECTION_OFFSETS[direction];
        let to = Location::new(from.x + dx, from.y + dy);
        if Self::contains(spec, to) { to } else { from }
    }

    fn transition_model(spec: &GridWorldSpec, walls: &[Wall]) -> Result<TransitionModel> {
        let n_states = (spec.width * spec.height) as usize;
        let next: Vec<Vec<StateIndex>> = (0..n_states)
            .map(|state| {
                let from = Self::location_of(spec, state);
                (0..DIRECTION_LABELS.len())
                    .map(|direction| {
                        Self::index_of(spec, Self::successor(spec, walls, from, direction))
                    })
                    .collect()
            })
            .collect();
        TransitionModel::deterministic(&next)
    }

    fn active_trial(&self) -> Result<&TrialSpec> {
        self.spec.trials.get(self.trial).ok_or(Error::TaskExhausted)
    }

    fn start_trial(&mut self, trial: usize) {
        self.trial = trial;
        self.steps_in_trial = 0;
        if let Some(spec) = self.spec.trials.get(trial) {
            self.location = spec.start;
        }
    }
}

impl Task for GridWorld {
    fn observe(&self) -> Option<Observation> {
        let trial = self.spec.trials.get(self.trial)?;
        Some(Observation {
            location: self.location,
            state: Self::index_of(&self.spec, self.location),
            context: trial.context,
        })
    }

    fn step(&mut self, primitive: usize) -> Result<Experience> {
        let trial = self.active_trial()?;
        let abstract_action = *trial.action_map.get(&primitive).ok_or(Error::InvalidAction {
            action: primitive,
            limit: self.spec.n_primitive_actions,
        })?;
        let context = trial.context;
        let goal = trial.goal;
        let from = self.location;
        let to = Self::successor(&self.spec, &trial.walls, from, abstract_action);
        let reward = if to == goal { 1.0 } else { 0.0 };

        let experience = Experience {
            start: Observation {
                location: from,
                state: Self::index_of(&self.spec, from),
                context,
            },
            primitive_action: primitive,
            abstract_action,
            reward,
            end: Observation {
                location: to,
                state: Self::index_of(&self.spec, to),
                context,
            },
        };
        debug_assert!({
            let (dx, dy) = from.delta_to(&to);
            to == from || displacement_to_abstract_action(dx, dy) == Some(abstract_action)
        });

        self.location = to;
        self.steps_in_trial += 1;
        if to == goal || self.steps_in_trial >= self.spec.max_steps_per_trial {
            self.start_trial(self.trial + 1);
        }
        Ok(experience)
    }

    fn trial(&self) -> Result<&TrialSpec> {
        self.active_trial()
    }

    fn trial_number(&self) -> usize {
        self.trial
    }

    fn n_trials(&self) -> usize {
        self.spec.trials.len()
    }

    fn n_contexts(&self) -> usize {
        self.n_contexts
    }

    fn n_states(&self) -> usize {
        (self.spec.width * self.spec.height) as usize
    }

    fn state_of(&self, location: Location) -> Result<StateIndex> {
        if !Self::contains(&self.spec, location) {
            return Err(Error::UnknownLocation {
                x: location.x,
                y: location.y,
            });
        }
        Ok(Self::index_of(&self.spec, location))
    }

    fn n_primitive_actions(&self) -> usize {
        self.spec.n_primitive_actions
    }

    fn n_abstract_actions(&self) -> usize {
        DIRECTION_LABELS.len()
    }

    fn transitions(&self) -> Result<&TransitionModel> {
        self.models.get(self.trial).ok_or(Error::TaskExhausted)
    }

    fn abstract_action_label(&self, abstract_action: usize) -> &str {
        DIRECTION_LABELS
            .get(abstract_action)
            .copied()
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor(walls: Vec<Wall>) -> GridWorld {
        let spec = GridWorldSpec {
            width: 3,
            height: 1,
            n_primitive_actions: 8,
            max_steps_per_trial: 5,
            trials: vec![
                TrialSpec {
                    context: 0,
                    start: Location::new(0, 0),
                    goal: Location::new(2, 0),
                    action_map: paired_action_map([0, 1, 2, 3]),
                    walls,
                },
                TrialSpec {
                    context: 3,
                    start: Location::new(2, 0),
                    goal: Location::new(0, 0),
                    action_map: paired_action_map([1, 0, 3, 2]),
                    walls: Vec::new(),
                },
            ],
        };
        GridWorld::new(spec).unwrap()
    }

    #[test]
    fn reaching_the_goal_pays_and_starts_the_next_trial() {
        let mut task = corridor(Vec::new());
        assert_eq!(task.n_contexts(), 4);
        let first = task.step(0).unwrap();
        assert_eq!(first.abstract_action, 0);
        assert_eq!(first.end.location, Location::new(1, 0));
        assert_eq!(first.reward, 0.0);

        let second = task.step(1).unwrap();
        assert_eq!(second.reward, 1.0);
        assert_eq!(task.trial_number(), 1);
        let observation = task.observe().unwrap();
        assert_eq!(observation.location, Location::new(2, 0));
        assert_eq!(observation.context, 3);
    }

    #[test]
    fn keys_follow_the_trial_mapping() {
        let mut task = corridor(Vec::new());
        task.step(0).unwrap();
        task.step(0).unwrap();
        // second trial swaps left and right: key 0 now moves left
        let experience = task.step(0).unwrap();
        assert_eq!(experience.abstract_action, 1);
        assert_eq!(experience.end.location, Location::new(1, 0));
        assert_eq!(task.abstract_action_label(1), "left");
    }

    #[test]
    fn walls_and_edges_block_movement() {
        let mut task = corridor(vec![Wall {
            location: Location::new(0, 0),
            direction: 0,
        }]);
        let blocked = task.step(0).unwrap();
        assert_eq!(blocked.end.location, Location::new(0, 0));
        let edge = task.step(2).unwrap();
        assert_eq!(edge.end.location, Location::new(0, 0));
        assert_eq!(edge.abstract_action, 1);
    }

    #[test]
    fn step_cap_ends_a_trial_and_exhaustion_is_reported() {
        let mut task = corridor(Vec::new());
        for _ in 0..5 {
            task.step(2).unwrap();
        }
        assert_eq!(task.trial_number(), 1);
        task.step(0).unwrap();
        task.step(0).unwrap();
        assert!(task.observe().is_none());
        assert!(matches!(task.step(0), Err(Error::TaskExhausted)));
        assert!(task.transitions().is_err());
    }

    #[test]
    fn transition_model_matches_stepping() {
        let task = corridor(Vec::new());
        let model = task.transitions().unwrap();
        assert_eq!(model.n_states(), 3);
        assert_eq!(model.row(0, 0).unwrap(), &[0.0, 1.0, 0.0]);
        assert_eq!(model.row(0, 1).unwrap(), &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn locations_map_to_row_major_states() {
        let task = GridWorld::demo().unwrap();
        assert_eq!(task.state_of(Location::new(0, 0)).unwrap(), 0);
        assert_eq!(task.state_of(Location::new(5, 5)).unwrap(), 35);
        assert_eq!(task.state_of(Location::new(2, 1)).unwrap(), 8);
        assert!(matches!(
            task.state_of(Location::new(6, 0)),
            Err(Error::UnknownLocation { x: 6, y: 0 })
        ));
    }

    #[test]
    fn invalid_layouts_are_rejected() {
        let mut spec = GridWorldSpec::demo();
        spec.trials[0].goal = Location::new(9, 9);
        assert!(matches!(GridWorld::new(spec), Err(Error::UnknownLocation { x: 9, y: 9 })));

        let mut spec = GridWorldSpec::demo();
        spec.trials[1].action_map.remove(&7);
        assert!(GridWorld::new(spec).is_err());
    }

    #[test]
    fn demo_spec_survives_json() {
        let spec = GridWorldSpec::demo();
        let json = serde_json::to_string(&spec).unwrap();
        let parsed: GridWorldSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, spec);
        assert_eq!(GridWorld::new(parsed).unwrap().n_contexts(), 2);
    }
}
