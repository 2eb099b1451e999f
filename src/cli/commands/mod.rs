//! CLI command implementations

pub mod enumerate;
pub mod run;
