//! Common test utilities for the tasksets test suite.
//!
//! Small grid worlds and hand-built experiences shared by the integration
//! tests.

#![allow(dead_code)]

use tasksets::{
    adapters::{GridWorld, GridWorldSpec, grid_world::paired_action_map},
    engine::TaskDimensions,
    ports::TrialSpec,
    types::{Experience, Location, Observation},
};

/// Keys `0..4` move right; keys `4..8` move left (up and down are no-ops on a
/// single row).
pub const FORWARD: [usize; 4] = [0, 0, 1, 1];

/// [`FORWARD`] with left and right swapped.
pub const REVERSED: [usize; 4] = [1, 1, 0, 0];

/// A trial on a one-row corridor.
pub fn corridor_trial(context: usize, start: i32, goal: i32, directions: [usize; 4]) -> TrialSpec {
    TrialSpec {
        context,
        start: Location::new(start, 0),
        goal: Location::new(goal, 0),
        action_map: paired_action_map(directions),
        walls: Vec::new(),
    }
}

/// One-row grid world of `width` cells running `trials` in order.
pub fn corridor(width: i32, trials: Vec<TrialSpec>) -> GridWorld {
    GridWorld::new(GridWorldSpec {
        width,
        height: 1,
        n_primitive_actions: 8,
        max_steps_per_trial: 1_000,
        trials,
    })
    .unwrap()
}

/// `n_trials` corridor trials cycling through contexts `0..n_contexts`, all
/// sharing the goal at the right end and the forward mapping.
pub fn cycling_corridor(width: i32, n_contexts: usize, n_trials: usize) -> GridWorld {
    let trials = (0..n_trials)
        .map(|trial| corridor_trial(trial % n_contexts, 0, width - 1, FORWARD))
        .collect();
    corridor(width, trials)
}

/// Dimensions with 4 keys and 2 directions.
pub fn small_dims(n_states: usize, n_contexts: usize) -> TaskDimensions {
    TaskDimensions {
        n_states,
        n_primitive_actions: 4,
        n_abstract_actions: 2,
        n_contexts,
    }
}

/// A step from state 0 to state 1 on a one-row grid.
pub fn press(context: usize, primitive: usize, abstract_action: usize, reward: f64) -> Experience {
    let at = |state: usize| Observation {
        location: Location::new(state as i32, 0),
        state,
        context,
    };
    Experience {
        start: at(0),
        primitive_action: primitive,
        abstract_action,
        reward,
        end: at(1),
    }
}

/// Five presses of every key under a two-keys-per-direction mapping over
/// two directions; `swapped` exchanges the directions.
pub fn mapping_evidence(context: usize, swapped: bool) -> Vec<Experience> {
    let mut experiences = Vec::new();
    for _ in 0..5 {
        for key in 0..4 {
            let direction = usize::from(key >= 2) ^ usize::from(swapped);
            experiences.push(press(context, key, direction, 0.0));
        }
    }
    experiences
}
