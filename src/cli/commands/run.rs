//! Run command - drive an agent through every trial of a grid-world task

use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::to_writer_pretty;
use tracing::info;

use crate::{
    adapters::GridWorld,
    agent::{Agent, RunSummary, StepRecord},
    baseline::FullInformationAgent,
    cli::output::{format_number, print_kv, print_section, print_subsection},
    config::{AgentConfig, ClusteringVariant},
    observers::{CsvObserver, JsonlObserver, MetricsObserver, ProgressObserver},
    ports::{Observer, Task},
    types::Location,
};

#[derive(Parser, Debug)]
#[command(about = "Run an agent over a grid-world task")]
pub struct RunArgs {
    /// Clustering variant: joint, independent, flat or full-enumeration
    #[arg(long, short = 'v')]
    pub variant: Option<ClusteringVariant>,

    /// Grid-world task description (JSON); the built-in demo when omitted
    #[arg(long, short = 'g')]
    pub grid: Option<PathBuf>,

    /// Agent configuration (JSON); flags below override its fields
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long, short = 's')]
    pub seed: Option<u64>,

    /// Exploration rate
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// CRP concentration
    #[arg(long)]
    pub alpha: Option<f64>,

    /// Softmax inverse temperature
    #[arg(long)]
    pub inverse_temperature: Option<f64>,

    /// Prune hypotheses more than ln(threshold) below the best
    #[arg(long)]
    pub pruning_threshold: Option<f64>,

    /// Full enumeration: give every context its own reward cluster
    #[arg(long, default_value_t = false)]
    pub no_reward_clustering: bool,

    /// Candidate goal location as X,Y; repeat for several
    #[arg(long, value_name = "X,Y")]
    pub goal_prior: Vec<Location>,

    /// Run the full-information baseline instead of a learning agent
    #[arg(
        long,
        default_value_t = false,
        conflicts_with_all = ["variant", "no_reward_clustering", "summary"]
    )]
    pub full_information: bool,

    /// Write one CSV row per step
    #[arg(long)]
    pub csv: Option<PathBuf>,

    /// Write one JSON line per step
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Write the run summary as pretty JSON
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Show a progress bar over trials
    #[arg(long, default_value_t = false)]
    pub progress: bool,
}

impl RunArgs {
    /// Resolve the agent configuration: file (or defaults), then flags.
    pub fn agent_config(&self) -> Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => AgentConfig::from_json_file(path)
                .with_context(|| format!("loading agent config {}", path.display()))?,
            None => AgentConfig::new(self.variant.unwrap_or_default()),
        };
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(epsilon) = self.epsilon {
            config = config.with_epsilon(epsilon);
        }
        if let Some(alpha) = self.alpha {
            config = config.with_alpha(alpha);
        }
        if let Some(beta) = self.inverse_temperature {
            config = config.with_inverse_temperature(beta);
        }
        if let Some(threshold) = self.pruning_threshold {
            config = config.with_pruning_threshold(threshold);
        }
        if self.no_reward_clustering {
            config = config.with_reward_clustering(false);
        }
        if !self.goal_prior.is_empty() {
            config = config.with_goal_prior(self.goal_prior.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn execute(args: RunArgs) -> Result<()> {
    let config = args.agent_config()?;
    let mut task = match &args.grid {
        Some(path) => GridWorld::from_json_file(path)
            .with_context(|| format!("loading grid world {}", path.display()))?,
        None => GridWorld::demo()?,
    };

    let mut metrics = MetricsObserver::new();
    let mut progress = args.progress.then(ProgressObserver::new);
    let mut csv = args.csv.as_ref().map(CsvObserver::new).transpose()?;
    let mut jsonl = args.jsonl.as_ref().map(JsonlObserver::new).transpose()?;

    let mut observers: Vec<&mut dyn Observer> = Vec::new();
    observers.push(&mut metrics);
    if let Some(observer) = progress.as_mut() {
        observers.push(observer);
    }
    if let Some(observer) = csv.as_mut() {
        observers.push(observer);
    }
    if let Some(observer) = jsonl.as_mut() {
        observers.push(observer);
    }

    let summary = if args.full_information {
        let mut oracle = FullInformationAgent::new(&config.hyperparameters)?;
        info!(
            trials = task.n_trials(),
            contexts = task.n_contexts(),
            "running full-information baseline"
        );
        let records = oracle.run(&mut task, &mut observers)?;
        print_baseline(&records, &metrics, task.n_contexts());
        None
    } else {
        let mut agent = Agent::for_task(config, &task)?;
        info!(
            variant = %agent.config().variant,
            trials = task.n_trials(),
            contexts = task.n_contexts(),
            "running agent"
        );
        let records = agent.run(&mut task, &mut observers)?;
        let summary = agent.summarize(&records)?;
        print_summary(&summary, &metrics, task.n_contexts());
        Some(summary)
    };

    if let Some(path) = &args.csv {
        println!("\nStep records written to {}", path.display());
    }
    if let Some(path) = &args.jsonl {
        println!("Step records written to {}", path.display());
    }
    if let (Some(path), Some(summary)) = (&args.summary, &summary) {
        let file = File::create(path)
            .with_context(|| format!("creating summary file {}", path.display()))?;
        to_writer_pretty(file, summary)?;
        println!("Summary written to {}", path.display());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, metrics: &MetricsObserver, n_contexts: usize) {
    print_section(&format!("{} ({})", summary.engine, summary.variant));
    print_kv("Trials", &format_number(summary.trials));
    print_kv("Steps", &format_number(summary.steps));
    print_kv("Goals reached", &format_number(summary.goals_reached));
    print_kv("Total reward", &format!("{:.1}", summary.total_reward));
    print_kv(
        "Mean steps per trial",
        &format!("{:.2}", summary.mean_steps_per_trial),
    );

    print_subsection("Hypothesis space");
    print_kv(
        "Reward hypotheses",
        &format_number(summary.population_sizes.reward),
    );
    print_kv(
        "Mapping hypotheses",
        &format_number(summary.population_sizes.mapping),
    );
    print_kv(
        "Best reward clustering",
        &summary.best_assignments.reward.label(),
    );
    print_kv(
        "Best mapping clustering",
        &summary.best_assignments.mapping.label(),
    );

    print_subsection("Per context");
    for context in 0..n_contexts {
        let steps = metrics
            .mean_steps_in(context)
            .map_or_else(|| "-".to_string(), |steps| format!("{steps:.2}"));
        let divergence = summary
            .mapping_divergence
            .get(&context)
            .map_or_else(|| "-".to_string(), |kl| format!("{kl:.3} bits"));
        print_kv(
            &format!("Context {context}"),
            &format!("{steps} steps/trial, mapping KL {divergence}"),
        );
    }
}

fn print_baseline(records: &[StepRecord], metrics: &MetricsObserver, n_contexts: usize) {
    print_section("Full Information (baseline)");
    print_kv("Trials", &format_number(metrics.trials().len()));
    print_kv("Steps", &format_number(records.len()));
    print_kv(
        "Goals reached",
        &format_number(records.iter().filter(|r| r.in_goal).count()),
    );
    print_kv(
        "Total reward",
        &format!("{:.1}", records.iter().map(|r| r.reward).sum::<f64>()),
    );
    print_kv("Mean steps per trial", &format!("{:.2}", metrics.mean_steps()));

    print_subsection("Per context");
    for context in 0..n_contexts {
        let steps = metrics
            .mean_steps_in(context)
            .map_or_else(|| "-".to_string(), |steps| format!("{steps:.2} steps/trial"));
        print_kv(&format!("Context {context}"), &steps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunArgs {
        RunArgs::try_parse_from(std::iter::once("run").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&["--variant", "independent", "--seed", "4", "--epsilon", "0.1"])
            .agent_config()
            .unwrap();
        assert_eq!(config.variant, ClusteringVariant::Independent);
        assert_eq!(config.seed, Some(4));
        assert_eq!(config.hyperparameters.epsilon, 0.1);
    }

    #[test]
    fn full_enumeration_keeps_its_default_epsilon() {
        let config = parse(&["-v", "full"]).agent_config().unwrap();
        assert_eq!(config.variant, ClusteringVariant::FullEnumeration);
        assert_eq!(config.hyperparameters.epsilon, 0.025);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        assert!(
            parse(&["--pruning-threshold", "0.5"])
                .agent_config()
                .is_err()
        );
    }

    #[test]
    fn goal_prior_flags_collect_locations() {
        let config = parse(&["--goal-prior", "5,5", "--goal-prior", "(0, 5)"])
            .agent_config()
            .unwrap();
        assert_eq!(
            config.goal_prior,
            vec![Location::new(5, 5), Location::new(0, 5)]
        );
    }

    #[test]
    fn malformed_goal_prior_fails_to_parse() {
        assert!(RunArgs::try_parse_from(["run", "--goal-prior", "5"]).is_err());
    }

    #[test]
    fn full_information_excludes_clustering_flags() {
        assert!(parse(&["--full-information"]).full_information);
        assert!(
            RunArgs::try_parse_from(["run", "--full-information", "--variant", "joint"]).is_err()
        );
        assert!(
            RunArgs::try_parse_from(["run", "--full-information", "--no-reward-clustering"])
                .is_err()
        );
    }

    #[test]
    fn unknown_variant_fails_to_parse() {
        assert!(RunArgs::try_parse_from(["run", "--variant", "bogus"]).is_err());
    }
}
