//! Enumerate command - list every clustering of a number of contexts

use anyhow::{Result, bail};
use clap::Parser;

use crate::{
    assignments::enumerate_assignments,
    cli::output::{format_number, print_kv, print_section},
};

/// Beyond this the listing is millions of lines long.
const MAX_CONTEXTS: usize = 12;

#[derive(Parser, Debug)]
#[command(about = "List every partition of contexts into clusters")]
pub struct EnumerateArgs {
    /// Number of contexts
    pub contexts: usize,

    /// Print only the count
    #[arg(long, default_value_t = false)]
    pub count_only: bool,
}

pub fn execute(args: EnumerateArgs) -> Result<()> {
    if args.contexts > MAX_CONTEXTS {
        bail!(
            "refusing to enumerate {} contexts (at most {MAX_CONTEXTS})",
            args.contexts
        );
    }
    let assignments = enumerate_assignments(args.contexts);
    print_section(&format!("Clusterings of {} contexts", args.contexts));
    if !args.count_only {
        for assignment in &assignments {
            println!(
                "  {:16} {} cluster(s)",
                assignment.label(),
                assignment.n_clusters()
            );
        }
    }
    print_kv("Assignments", &format_number(assignments.len()));
    Ok(())
}
