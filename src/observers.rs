//! Observer implementations for agent runs
//!
//! - [`ProgressObserver`] draws a progress bar over trials
//! - [`MetricsObserver`] keeps per-trial step counts in memory
//! - [`JsonlObserver`] writes one JSON object per step
//! - [`CsvObserver`] writes one CSV row per step

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, agent::StepRecord, ports::Observer, types::ContextId};

/// Progress bar observer - one tick per completed trial
#[derive(Default)]
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    goals: usize,
    steps: usize,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Observer for ProgressObserver {
    fn on_run_start(&mut self, n_trials: usize) -> Result<()> {
        let pb = ProgressBar::new(n_trials as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} trials ({msg})")
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_step(&mut self, record: &StepRecord) -> Result<()> {
        self.steps += 1;
        if let Some(pb) = &self.progress_bar {
            // trial_number is the index of the trial this step belongs to
            let finished = if record.in_goal {
                self.goals += 1;
                record.trial_number as u64 + 1
            } else {
                record.trial_number as u64
            };
            pb.set_position(finished);
            pb.set_message(format!("{} steps, {} goals", self.steps, self.goals));
        }
        Ok(())
    }

    fn on_run_end(&mut self) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.finish_with_message(format!("{} steps, {} goals", self.steps, self.goals));
        }
        Ok(())
    }
}

/// Steps taken in one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialMetrics {
    pub trial_number: usize,
    pub context: ContextId,
    pub steps: usize,
    pub reached_goal: bool,
}

/// Metrics observer - tracks per-trial learning curves
#[derive(Debug, Default)]
pub struct MetricsObserver {
    trials: Vec<TrialMetrics>,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trials(&self) -> &[TrialMetrics] {
        &self.trials
    }

    /// Mean steps per trial, or 0 before any step.
    pub fn mean_steps(&self) -> f64 {
        if self.trials.is_empty() {
            0.0
        } else {
            self.trials.iter().map(|t| t.steps).sum::<usize>() as f64 / self.trials.len() as f64
        }
    }

    /// Mean steps per trial restricted to `context`.
    pub fn mean_steps_in(&self, context: ContextId) -> Option<f64> {
        let steps: Vec<usize> = self
            .trials
            .iter()
            .filter(|t| t.context == context)
            .map(|t| t.steps)
            .collect();
        if steps.is_empty() {
            None
        } else {
            Some(steps.iter().sum::<usize>() as f64 / steps.len() as f64)
        }
    }
}

impl Observer for MetricsObserver {
    fn on_run_start(&mut self, _n_trials: usize) -> Result<()> {
        self.trials.clear();
        Ok(())
    }

    fn on_step(&mut self, record: &StepRecord) -> Result<()> {
        match self.trials.last_mut() {
            Some(last) if last.trial_number == record.trial_number => {
                last.steps = record.steps_taken;
                last.reached_goal |= record.in_goal;
            }
            _ => self.trials.push(TrialMetrics {
                trial_number: record.trial_number,
                context: record.context,
                steps: record.steps_taken,
                reached_goal: record.in_goal,
            }),
        }
        Ok(())
    }
}

/// JSONL observer - exports each step record as one JSON line
pub struct JsonlObserver {
    writer: BufWriter<File>,
}

impl JsonlObserver {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create {}", path.display()),
            source,
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl Observer for JsonlObserver {
    fn on_step(&mut self, record: &StepRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        writeln!(&mut self.writer)?;
        Ok(())
    }

    fn on_run_end(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Flat CSV form of a [`StepRecord`]; locations and maps are rendered as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    pub start_location: String,
    pub end_location: String,
    pub context: ContextId,
    pub key_press: usize,
    pub action: String,
    pub reward: f64,
    pub steps_taken: usize,
    pub trial_number: usize,
    pub in_goal: bool,
    pub times_seen_context: usize,
    /// `key:direction` pairs separated by spaces.
    pub action_map: String,
    pub goal_location: String,
    /// `(x, y):direction` entries separated by spaces.
    pub walls: String,
}

impl From<&StepRecord> for CsvRow {
    fn from(record: &StepRecord) -> Self {
        Self {
            start_location: record.start_location.to_string(),
            end_location: record.end_location.to_string(),
            context: record.context,
            key_press: record.key_press,
            action: record.action.clone(),
            reward: record.reward,
            steps_taken: record.steps_taken,
            trial_number: record.trial_number,
            in_goal: record.in_goal,
            times_seen_context: record.times_seen_context,
            action_map: record
                .action_map
                .iter()
                .map(|(key, direction)| format!("{key}:{direction}"))
                .collect::<Vec<_>>()
                .join(" "),
            goal_location: record.goal_location.to_string(),
            walls: record
                .walls
                .iter()
                .map(|wall| format!("{}:{}", wall.location, wall.direction))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// CSV observer - exports each step record as one row
pub struct CsvObserver {
    writer: csv::Writer<File>,
}

impl CsvObserver {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            writer: csv::Writer::from_path(path)?,
        })
    }
}

impl Observer for CsvObserver {
    fn on_step(&mut self, record: &StepRecord) -> Result<()> {
        self.writer.serialize(CsvRow::from(record))?;
        Ok(())
    }

    fn on_run_end(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{ports::Wall, types::Location};

    fn record(trial_number: usize, steps_taken: usize, in_goal: bool) -> StepRecord {
        StepRecord {
            start_location: Location::new(0, 0),
            end_location: Location::new(1, 0),
            context: trial_number % 2,
            key_press: 3,
            action: "right".to_string(),
            reward: if in_goal { 1.0 } else { 0.0 },
            steps_taken,
            trial_number,
            in_goal,
            times_seen_context: 1,
            action_map: BTreeMap::from([(0, 0), (1, 2)]),
            goal_location: Location::new(1, 0),
            walls: vec![Wall {
                location: Location::new(0, 0),
                direction: 3,
            }],
        }
    }

    #[test]
    fn metrics_group_steps_by_trial() {
        let mut metrics = MetricsObserver::new();
        metrics.on_run_start(2).unwrap();
        for (trial, step, goal) in [(0, 1, false), (0, 2, false), (0, 3, true), (1, 1, true)] {
            metrics.on_step(&record(trial, step, goal)).unwrap();
        }
        assert_eq!(metrics.trials().len(), 2);
        assert_eq!(metrics.trials()[0].steps, 3);
        assert!(metrics.trials()[0].reached_goal);
        assert_eq!(metrics.mean_steps(), 2.0);
        assert_eq!(metrics.mean_steps_in(1), Some(1.0));
        assert_eq!(metrics.mean_steps_in(7), None);
    }

    #[test]
    fn csv_row_flattens_nested_fields() {
        let row = CsvRow::from(&record(0, 1, true));
        assert_eq!(row.action_map, "0:0 1:2");
        assert_eq!(row.walls, "(0, 0):3");
        assert_eq!(row.goal_location, "(1, 0)");
    }
}
