//! Full-information baseline: plans on the true goal and presses the true key.
//!
//! Nothing is learned. Each step solves the active trial's transition model
//! for a reward of 1 at the goal and 0 elsewhere, takes the best direction
//! the trial's action map can produce, and presses the lowest key that maps
//! to it. Step counts from this agent are the floor the learning agents are
//! measured against.

use tracing::info;

use crate::{
    Error, Result,
    agent::{ContextVisits, Controller, StepRecord, drive},
    config::Hyperparameters,
    planner::policy_iteration,
    ports::{Observer, Task},
    types::{ActionChoice, ContextId, Experience, Observation},
    utils::argmax,
};

/// Oracle that reads the goal and the key mapping straight from the task.
///
/// # Examples
///
/// ```
/// use tasksets::{
///     adapters::GridWorld, baseline::FullInformationAgent, config::Hyperparameters,
/// };
///
/// let mut task = GridWorld::demo().unwrap();
/// let mut oracle = FullInformationAgent::new(&Hyperparameters::default()).unwrap();
/// let records = oracle.generate(&mut task).unwrap();
/// assert_eq!(records.iter().filter(|r| r.in_goal).count(), 8);
/// ```
#[derive(Debug, Clone)]
pub struct FullInformationAgent {
    discount: f64,
    iteration_criterion: f64,
    visits: ContextVisits,
}

impl FullInformationAgent {
    /// Only the planning parameters of `params` are used.
    pub fn new(params: &Hyperparameters) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            discount: params.discount,
            iteration_criterion: params.iteration_criterion,
            visits: ContextVisits::default(),
        })
    }

    pub fn context_visits(&self) -> &ContextVisits {
        &self.visits
    }

    /// Best direction at `observation` among those some key produces.
    pub fn select_abstract_action(
        &self,
        observation: &Observation,
        task: &dyn Task,
    ) -> Result<usize> {
        let trial = task.trial()?;
        let model = task.transitions()?;
        let mut rewards = vec![0.0; model.n_states()];
        let goal = task.state_of(trial.goal)?;
        rewards[goal] = 1.0;

        let policy = policy_iteration(model, &rewards, self.discount, self.iteration_criterion)?;
        let mut q_values = policy.q_values(model, &rewards, self.discount, observation.state)?;
        for (direction, q) in q_values.iter_mut().enumerate() {
            if !trial.action_map.values().any(|&mapped| mapped == direction) {
                *q = f64::NEG_INFINITY;
            }
        }
        argmax(&q_values)
            .filter(|&direction| q_values[direction].is_finite())
            .ok_or_else(|| {
                Error::config(format!(
                    "trial in context {} maps no key to any direction",
                    trial.context
                ))
            })
    }

    /// The planned direction and the lowest key that produces it.
    pub fn select_action(
        &self,
        observation: &Observation,
        task: &dyn Task,
    ) -> Result<ActionChoice> {
        let abstract_action = self.select_abstract_action(observation, task)?;
        let primitive = task
            .trial()?
            .action_map
            .iter()
            .find(|&(_, &direction)| direction == abstract_action)
            .map(|(&key, _)| key)
            .ok_or(Error::InvalidAction {
                action: abstract_action,
                limit: task.n_abstract_actions(),
            })?;
        Ok(ActionChoice {
            primitive,
            abstract_action: Some(abstract_action),
        })
    }

    /// Run every remaining trial and return one record per step.
    pub fn generate(&mut self, task: &mut dyn Task) -> Result<Vec<StepRecord>> {
        self.run(task, &mut [])
    }

    /// Like [`generate`](Self::generate), reporting to `observers` as it goes.
    pub fn run(
        &mut self,
        task: &mut dyn Task,
        observers: &mut [&mut dyn Observer],
    ) -> Result<Vec<StepRecord>> {
        let records = drive(self, task, observers)?;
        info!(steps = records.len(), "full-information run complete");
        Ok(records)
    }
}

impl Controller for FullInformationAgent {
    fn label(&self) -> &str {
        "Full Information"
    }

    fn visits_mut(&mut self) -> &mut ContextVisits {
        &mut self.visits
    }

    fn enter_context(&mut self, _context: ContextId, _trial_number: usize) -> Result<()> {
        Ok(())
    }

    fn choose(&mut self, observation: &Observation, task: &dyn Task) -> Result<ActionChoice> {
        self.select_action(observation, task)
    }

    fn learn(&mut self, _experience: &Experience) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::{GridWorld, GridWorldSpec, grid_world::paired_action_map},
        ports::TrialSpec,
        types::Location,
    };

    fn oracle() -> FullInformationAgent {
        FullInformationAgent::new(&Hyperparameters::default()).unwrap()
    }

    #[test]
    fn presses_the_key_the_trial_maps_to_the_planned_direction() {
        // right and left swapped: keys 2 and 3 move right
        let spec = GridWorldSpec {
            width: 4,
            height: 1,
            n_primitive_actions: 8,
            max_steps_per_trial: 50,
            trials: vec![TrialSpec {
                context: 0,
                start: Location::new(0, 0),
                goal: Location::new(3, 0),
                action_map: paired_action_map([1, 0, 2, 3]),
                walls: Vec::new(),
            }],
        };
        let task = GridWorld::new(spec).unwrap();
        let observation = task.observe().unwrap();
        let choice = oracle().select_action(&observation, &task).unwrap();
        assert_eq!(choice.abstract_action, Some(0));
        assert_eq!(choice.primitive, 2);
    }

    #[test]
    fn walks_around_walls_to_every_goal() {
        let mut task = GridWorld::demo().unwrap();
        let mut agent = oracle();
        let records = agent.generate(&mut task).unwrap();

        let goals: Vec<&StepRecord> = records.iter().filter(|r| r.in_goal).collect();
        assert_eq!(goals.len(), 8);
        // trial 1 starts at (0, 5) with no wall: five steps right
        assert_eq!(goals[1].steps_taken, 5);
        // trial 0 starts at (0, 0): ten steps, the wall does not lengthen the path
        assert_eq!(goals[0].steps_taken, 10);
        assert_eq!(agent.context_visits().get(0), 4);
    }

    #[test]
    fn exhausted_task_has_no_plan() {
        let mut task = GridWorld::demo().unwrap();
        let mut agent = oracle();
        agent.generate(&mut task).unwrap();
        let observation = Observation {
            location: Location::new(0, 0),
            state: 0,
            context: 0,
        };
        assert!(matches!(
            agent.select_action(&observation, &task),
            Err(Error::TaskExhausted)
        ));
    }
}
