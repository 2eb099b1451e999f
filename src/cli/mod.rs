//! CLI infrastructure for the tasksets toolkit
//!
//! Subcommands run an agent over a grid-world task and list the partitions
//! the hypothesis space is built from.

pub mod commands;
pub mod output;
