//! Observer port - watching an agent run
//!
//! Observers receive every [`StepRecord`] the agent produces, so output
//! formats and progress reporting stay out of the trial loop.

use crate::{Result, agent::StepRecord};

/// Observer trait for monitoring a run
///
/// # Event Sequence
///
/// 1. `on_run_start(n_trials)` - once, before the first step
/// 2. `on_step(record)` - after every step, in order
/// 3. `on_run_end()` - once, after the task is exhausted
///
/// # Examples
///
/// ```
/// use tasksets::{agent::StepRecord, ports::Observer};
///
/// #[derive(Default)]
/// struct GoalCounter {
///     goals: usize,
/// }
///
/// impl Observer for GoalCounter {
///     fn on_step(&mut self, record: &StepRecord) -> tasksets::Result<()> {
///         if record.in_goal {
///             self.goals += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called before the first step.
    fn on_run_start(&mut self, _n_trials: usize) -> Result<()> {
        Ok(())
    }

    /// Called once per step, after the engine has been updated.
    fn on_step(&mut self, _record: &StepRecord) -> Result<()> {
        Ok(())
    }

    /// Called after the last step. Flush files and print summaries here.
    fn on_run_end(&mut self) -> Result<()> {
        Ok(())
    }
}
