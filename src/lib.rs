//! Hypothesis-selection agents that cluster contexts into task sets
//!
//! An agent acting in a sequence of grid-world trials sees a context cue
//! per trial and has to learn, per context, which goal is rewarded and how
//! key presses map onto movement directions. Contexts that share a reward
//! function or a key mapping can be clustered so that what was learned in
//! one transfers to the others.
//!
//! This crate provides:
//! - Canonical enumeration of context-to-cluster assignments
//! - Bayesian reward, mapping and task-set hypotheses with CRP priors
//! - Joint, independent, flat and full-enumeration engines
//! - An agent orchestrator with observers for progress, metrics and export
//! - A full-information baseline that plans on the true goal and mapping
//! - A configurable grid-world task

pub mod adapters;
pub mod agent;
pub mod assignments;
pub mod baseline;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod hypothesis;
pub mod observers;
pub mod planner;
pub mod ports;
pub mod types;
pub mod utils;

pub use agent::{Agent, RunSummary, StepRecord};
pub use assignments::{ClusterAssignment, augment_assignments, enumerate_assignments};
pub use config::{AgentConfig, ClusteringVariant, Hyperparameters};
pub use engine::{Engine, HypothesisEngine, TaskDimensions};
pub use error::{Error, Result};
pub use types::{ActionChoice, ContextId, Experience, Location, Observation};
