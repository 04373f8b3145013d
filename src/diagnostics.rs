use std::fmt::Write as _;

use crate::error::Error;
use crate::plan::{IssueSeverity, ValidationResult};
use crate::runner::{FindingLevel, RunReport};

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Print markdown to stderr with headings in bold.
pub fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is
/// one, how to fix it.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::ConfigNotFound { path } => format!("\
# Error: Config Not Found

`{}` does not exist. `validate` and `watch` read their inputs from its
`[validation]` table.

## Fix

Create `.nameplan.toml`; run `nameplan info` for an example.
", path.display()),

        Error::FileNotFound { path } => format!("\
# Error: File Not Found

`{}` does not exist.
", path.display()),

        Error::InvalidGlob { glob, pattern, reason } => format!("\
# Error: Invalid Glob

Rule glob `{glob}` in pattern `{pattern}` does not compile: {reason}

## Fix

Correct the `glob` of the rule in `.nameplan.toml`.
"),

        Error::InvalidInput { reason } => format!("\
# Error: Invalid Input

{reason}

This is a bug in whatever produced the scan result; nothing was planned.
"),

        Error::InvalidPattern { pattern, reason } => format!("\
# Error: Invalid Pattern

Pattern `{pattern}` does not compile: {reason}

## Fix

Correct the `incorrect` expressions of `{pattern}` in `.nameplan.toml`.
"),

        Error::ParseFailed { file, reason } => format!("\
# Error: Parse Failed

Could not parse `{}`: {reason}
", file.display()),

        Error::PlanCorrupt { reason } => format!("\
# Error: Plan Corrupt

{reason}

## Fix

Regenerate the plan:

    nameplan plan
"),

        Error::PlanNotFound { path } => format!("\
# Error: Plan Not Found

`{}` does not exist.

## Fix

Run `nameplan plan` to scan the project and write a plan:

    nameplan plan
", path.display()),

        Error::PlanRejected { count, first } => format!("\
# Error: Plan Rejected

The plan has {count} blocking finding(s) and cannot be ordered.

First: {first}

## Fix

Run `nameplan check` for the full list.
"),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: Invalid JSON

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}
"),
    }
}

/// Render a plan validation result. Empty when there is nothing to say.
pub fn render_validation(result: &ValidationResult) -> String {
    let mut out = String::new();

    if !result.errors.is_empty() {
        out.push_str("# Plan Errors\n\n");
        for error in &result.errors {
            let marker = match error.severity {
                IssueSeverity::Critical => "critical",
                IssueSeverity::Error => "error",
            };
            let _ = writeln!(out, "- [{marker}] `{}` {}", error.code.label(), error.message);
            if error.related_actions.len() > 1 {
                let _ = writeln!(out, "  actions: {}", error.related_actions.join(", "));
            }
        }
        out.push('\n');
    }

    if !result.warnings.is_empty() {
        out.push_str("# Plan Warnings\n\n");
        for warning in &result.warnings {
            let _ = writeln!(out, "- `{}` {}", warning.action_id, warning.message);
            let _ = writeln!(out, "  hint: {}", warning.suggestion);
        }
        out.push('\n');
    }

    if !result.suggestions.is_empty() {
        out.push_str("## Suggestions\n\n");
        for suggestion in &result.suggestions {
            let _ = writeln!(out, "- {suggestion}");
        }
        out.push('\n');
    }
    out
}

/// Render a validation runner report, one section per check.
pub fn render_run_report(report: &RunReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        let verdict = if check.passed() { "passed" } else { "failed" };
        let _ = write!(out, "# {}: {verdict}\n\n", check.check.label());

        for finding in &check.findings {
            let level = match finding.level {
                FindingLevel::Error => "error",
                FindingLevel::Warning => "warning",
            };
            let _ = writeln!(out, "- [{level}] `{}` {}: {}", finding.code, finding.location, finding.message);
            if let Some(suggestion) = &finding.suggestion {
                let _ = writeln!(out, "  fix: {suggestion}");
            }
        }
        if !check.fixed.is_empty() {
            out.push_str("\n## Fixed\n\n");
            for fixed in &check.fixed {
                let _ = writeln!(out, "- {fixed}");
            }
        }
        out.push('\n');
    }

    let errors = report.count(FindingLevel::Error);
    let warnings = report.count(FindingLevel::Warning);
    let _ = writeln!(out, "{errors} error(s), {warnings} warning(s)");
    out
}
