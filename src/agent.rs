//! Agent orchestrator: drives an engine through every trial of a task.

use std::collections::{BTreeMap, BTreeSet};

use rand::{SeedableRng, random, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Result,
    config::{AgentConfig, ClusteringVariant},
    engine::{
        BestAssignments, Engine, HypothesisEngine, PopulationSizes, TaskDimensions,
        selection::mapping_pmf,
    },
    ports::{Observer, Task, Wall},
    types::{ActionChoice, ContextId, Experience, Location, Observation},
    utils::kl_divergence,
};

/// One row of run output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub start_location: Location,
    pub end_location: Location,
    pub context: ContextId,
    pub key_press: usize,
    /// Direction the key produced, in words.
    pub action: String,
    pub reward: f64,
    /// 1-based step count within the trial.
    pub steps_taken: usize,
    pub trial_number: usize,
    pub in_goal: bool,
    pub times_seen_context: usize,
    pub action_map: BTreeMap<usize, usize>,
    pub goal_location: Location,
    pub walls: Vec<Wall>,
}

/// How many trials have started in each context.
///
/// The first entry into a context is what triggers prune-then-augment, so
/// a context is never added to the hypothesis space twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextVisits {
    counts: Vec<usize>,
}

impl ContextVisits {
    pub fn new(n_contexts: usize) -> Self {
        Self {
            counts: vec![0; n_contexts],
        }
    }

    /// Record a trial starting in `context`; returns the updated count.
    pub fn enter(&mut self, context: ContextId) -> usize {
        if context >= self.counts.len() {
            self.counts.resize(context + 1, 0);
        }
        self.counts[context] += 1;
        self.counts[context]
    }

    pub fn get(&self, context: ContextId) -> usize {
        self.counts.get(context).copied().unwrap_or(0)
    }
}

/// The deciding half of a run. [`drive`] owns the loop, the step records
/// and the observer fan-out.
pub(crate) trait Controller {
    fn label(&self) -> &str;

    fn visits_mut(&mut self) -> &mut ContextVisits;

    /// First step of the first trial in `context`.
    fn enter_context(&mut self, context: ContextId, trial_number: usize) -> Result<()>;

    fn choose(&mut self, observation: &Observation, task: &dyn Task) -> Result<ActionChoice>;

    fn learn(&mut self, experience: &Experience) -> Result<()>;
}

/// Step `controller` through every remaining trial of `task`.
pub(crate) fn drive<C: Controller>(
    controller: &mut C,
    task: &mut dyn Task,
    observers: &mut [&mut dyn Observer],
) -> Result<Vec<StepRecord>> {
    info!(
        agent = controller.label(),
        trials = task.n_trials(),
        contexts = task.n_contexts(),
        "starting run"
    );
    for observer in observers.iter_mut() {
        observer.on_run_start(task.n_trials())?;
    }

    let mut steps_in_trial = vec![0usize; task.n_trials()];
    let mut records = Vec::new();
    while let Some(observation) = task.observe() {
        let trial_number = task.trial_number();
        let context = observation.context;
        steps_in_trial[trial_number] += 1;

        let first_step = steps_in_trial[trial_number] == 1;
        if first_step && controller.visits_mut().enter(context) == 1 {
            controller.enter_context(context, trial_number)?;
        }

        let trial = task.trial()?.clone();
        let choice = controller.choose(&observation, &*task)?;
        let experience = task.step(choice.primitive)?;
        controller.learn(&experience)?;

        let record = StepRecord {
            start_location: experience.start.location,
            end_location: experience.end.location,
            context,
            key_press: choice.primitive,
            action: task
                .abstract_action_label(experience.abstract_action)
                .to_string(),
            reward: experience.reward,
            steps_taken: steps_in_trial[trial_number],
            trial_number,
            in_goal: experience.end.location == trial.goal,
            times_seen_context: controller.visits_mut().get(context),
            action_map: trial.action_map,
            goal_location: trial.goal,
            walls: trial.walls,
        };
        for observer in observers.iter_mut() {
            observer.on_step(&record)?;
        }
        records.push(record);
    }

    for observer in observers.iter_mut() {
        observer.on_run_end()?;
    }
    Ok(records)
}

/// End-of-run digest for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub engine: String,
    pub variant: ClusteringVariant,
    pub steps: usize,
    pub trials: usize,
    pub goals_reached: usize,
    pub total_reward: f64,
    pub mean_steps_per_trial: f64,
    pub population_sizes: PopulationSizes,
    pub best_assignments: BestAssignments,
    /// Per context, mean KL divergence (bits) from the true key distribution
    /// of each direction to the governing mapping's estimate.
    pub mapping_divergence: BTreeMap<ContextId, f64>,
}

/// A configured engine plus the random stream and visit bookkeeping of one run.
///
/// # Examples
///
/// ```
/// use tasksets::{
///     adapters::GridWorld,
///     agent::Agent,
///     config::{AgentConfig, ClusteringVariant},
/// };
///
/// let mut task = GridWorld::demo().unwrap();
/// let config = AgentConfig::new(ClusteringVariant::Joint).with_seed(3);
/// let mut agent = Agent::for_task(config, &task).unwrap();
/// let records = agent.generate(&mut task).unwrap();
/// assert!(records.last().unwrap().in_goal);
/// ```
#[derive(Debug, Clone)]
pub struct Agent {
    config: AgentConfig,
    engine: Engine,
    rng: StdRng,
    visits: ContextVisits,
}

impl Agent {
    /// Agent for a task of shape `dims`. Candidate goals need a grid to
    /// resolve against, so `config.goal_prior` only takes effect through
    /// [`for_task`](Self::for_task).
    pub fn new(config: AgentConfig, dims: TaskDimensions) -> Result<Self> {
        let engine = Engine::new(&config, dims)?;
        let rng = StdRng::seed_from_u64(config.seed.unwrap_or_else(random));
        Ok(Self {
            config,
            engine,
            rng,
            visits: ContextVisits::new(dims.n_contexts),
        })
    }

    /// Agent sized for `task`, with any candidate goals in
    /// `config.goal_prior` resolved against its grid.
    pub fn for_task(config: AgentConfig, task: &dyn Task) -> Result<Self> {
        let mut agent = Self::new(config, TaskDimensions::of(task))?;
        if !agent.config.goal_prior.is_empty() {
            let goals = agent
                .config
                .goal_prior
                .iter()
                .map(|&location| task.state_of(location))
                .collect::<Result<Vec<_>>>()?;
            agent.engine.set_goal_prior(&goals)?;
            debug!(candidates = goals.len(), "applied goal prior");
        }
        Ok(agent)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn context_visits(&self) -> &ContextVisits {
        &self.visits
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
        let sizes = self.engine.population_sizes();
        info!(
            steps = records.len(),
            reward_hypotheses = sizes.reward,
            mapping_hypotheses = sizes.mapping,
            "run complete"
        );
        Ok(records)
    }

    /// Mean KL divergence (bits) between the key distribution `action_map`
    /// induces for each direction and the governing mapping's estimate.
    pub fn mapping_divergence(
        &self,
        context: ContextId,
        action_map: &BTreeMap<usize, usize>,
    ) -> Result<f64> {
        let mapping = self.engine.governing_mapping();
        let mut total = 0.0;
        let mut directions = 0;
        for abstract_action in 0..mapping.n_abstract() {
            let keys: Vec<usize> = action_map
                .iter()
                .filter(|&(_, &aa)| aa == abstract_action)
                .map(|(&key, _)| key)
                .collect();
            if keys.is_empty() {
                continue;
            }
            let mut truth = vec![0.0; mapping.n_primitive()];
            for &key in &keys {
                if let Some(p) = truth.get_mut(key) {
                    *p = 1.0 / keys.len() as f64;
                }
            }
            let estimate = mapping_pmf(mapping, context, abstract_action)?;
            total += kl_divergence(&estimate, &truth);
            directions += 1;
        }
        Ok(if directions == 0 {
            0.0
        } else {
            total / directions as f64
        })
    }

    /// Digest of `records`, which should come from this agent's last run.
    pub fn summarize(&self, records: &[StepRecord]) -> Result<RunSummary> {
        let trials = records
            .iter()
            .map(|record| record.trial_number)
            .collect::<BTreeSet<_>>()
            .len();
        let goals_reached = records.iter().filter(|record| record.in_goal).count();

        let mut last_map: BTreeMap<ContextId, &BTreeMap<usize, usize>> = BTreeMap::new();
        for record in records {
            last_map.insert(record.context, &record.action_map);
        }
        let mut mapping_divergence = BTreeMap::new();
        for (context, action_map) in last_map {
            mapping_divergence.insert(context, self.mapping_divergence(context, action_map)?);
        }

        Ok(RunSummary {
            engine: self.engine.name().to_string(),
            variant: self.engine.variant(),
            steps: records.len(),
            trials,
            goals_reached,
            total_reward: records.iter().map(|record| record.reward).sum(),
            mean_steps_per_trial: if trials == 0 {
                0.0
            } else {
                records.len() as f64 / trials as f64
            },
            population_sizes: self.engine.population_sizes(),
            best_assignments: self.engine.best_assignments(),
            mapping_divergence,
        })
    }
}

impl Controller for Agent {
    fn label(&self) -> &str {
        self.engine.name()
    }

    fn visits_mut(&mut self) -> &mut ContextVisits {
        &mut self.visits
    }

    fn enter_context(&mut self, context: ContextId, trial_number: usize) -> Result<()> {
        let removed = self
            .engine
            .prune_hypothesis_space(self.config.pruning_threshold)?;
        self.engine.augment_assignments(context)?;
        let sizes = self.engine.population_sizes();
        debug!(
            context,
            trial = trial_number,
            removed,
            reward_hypotheses = sizes.reward,
            mapping_hypotheses = sizes.mapping,
            "entered new context"
        );
        Ok(())
    }

    fn choose(&mut self, observation: &Observation, task: &dyn Task) -> Result<ActionChoice> {
        self.engine
            .select_action(observation, task.transitions()?, &mut self.rng)
    }

    fn learn(&mut self, experience: &Experience) -> Result<()> {
        self.engine.update(experience)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::GridWorld;

    #[test]
    fn visits_count_per_context() {
        let mut visits = ContextVisits::new(2);
        assert_eq!(visits.enter(1), 1);
        assert_eq!(visits.enter(1), 2);
        assert_eq!(visits.enter(4), 1);
        assert_eq!(visits.get(0), 0);
        assert_eq!(visits.get(4), 1);
    }

    #[test]
    fn records_cover_every_trial_in_order() {
        let mut task = GridWorld::demo().unwrap();
        let config = AgentConfig::new(ClusteringVariant::Flat).with_seed(5);
        let mut agent = Agent::for_task(config, &task).unwrap();
        let records = agent.generate(&mut task).unwrap();

        let goals: Vec<usize> = records
            .iter()
            .filter(|r| r.in_goal)
            .map(|r| r.trial_number)
            .collect();
        assert_eq!(goals, (0..8).collect::<Vec<_>>());
        assert_eq!(records[0].steps_taken, 1);
        assert_eq!(records[0].times_seen_context, 1);
        assert_eq!(agent.context_visits().get(0), 4);
        assert_eq!(agent.context_visits().get(1), 4);
    }

    #[test]
    fn summary_reports_learned_mapping() {
        let mut task = GridWorld::demo().unwrap();
        let config = AgentConfig::new(ClusteringVariant::Joint).with_seed(9);
        let mut agent = Agent::for_task(config, &task).unwrap();
        let records = agent.generate(&mut task).unwrap();
        let summary = agent.summarize(&records).unwrap();
        assert_eq!(summary.trials, 8);
        assert_eq!(summary.goals_reached, 8);
        assert_eq!(summary.total_reward, 8.0);
        assert_eq!(summary.mapping_divergence.len(), 2);
        assert!(summary.mapping_divergence.values().all(|d| d.is_finite() && *d >= 0.0));
    }
}
