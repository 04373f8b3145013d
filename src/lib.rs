//! nameplan: find naming-convention violations and plan their fix.
//!
//! The pipeline is pure from the scan result onward:
//! [`scanner::Scanner::scan`] produces a [`types::ScanResult`],
//! [`planner::create_plan`] turns it into a [`plan::RefactorPlan`],
//! [`planner::validate_plan`] reports what blocks it, and
//! [`planner::optimize_plan`] orders a valid plan for execution.
//! File discovery, config, and the CLI sit around that core.

pub mod actions;
pub mod commands;
pub mod config;
pub mod conflicts;
pub mod diagnostics;
pub mod error;
pub mod files;
pub mod graph;
pub mod ids;
pub mod info;
pub mod logging;
pub mod matcher;
pub mod plan;
pub mod planfile;
pub mod planner;
pub mod rules;
pub mod runner;
pub mod scanner;
pub mod types;
pub mod watch;

pub use error::Error;
pub use plan::{RefactorPlan, ValidationResult};
pub use planner::{create_plan, optimize_plan, validate_plan};
pub use rules::{PatternSpec, RuleSet};
pub use scanner::{ScanOptions, Scanner};
pub use types::{ScanResult, SourceFile};
