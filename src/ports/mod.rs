//! Ports (trait boundaries) for external collaborators.
//!
//! The agent only talks to its environment through [`Task`] and reports what
//! happened through [`Observer`]; concrete environments and sinks live in
//! `adapters` and `observers`.

pub mod observer;
pub mod task;

pub use observer::Observer;
pub use task::{Task, TrialSpec, Wall};
