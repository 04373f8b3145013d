use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{self, Config};
use crate::planfile;

/// Category names accepted in `[[patterns]]`.
const CATEGORIES: [&str; 8] = ["api", "class", "config", "database", "display", "environment", "file", "variable"];

/// Exit codes shared by every command.
const EXIT_CODES: [(u8, &str); 3] = [
    (0, "Success / plan valid / all checks passed"),
    (1, "Plan invalid or a validation check failed"),
    (3, "Runtime error"),
];

/// Output the comprehensive nameplan reference document.
pub fn run(json: bool) {
    let root = PathBuf::from(".");
    let state = gather_state(&root);

    if json {
        print_json(&state);
    } else {
        print_markdown(&state);
    }
}

// ── State gathering ───────────────────────────────────────────────────

/// What nameplan can see in the working directory.
struct CurrentState {
    /// Whether `.nameplan.toml` exists.
    config_found: bool,
    /// Pattern ids, when the config parses.
    patterns: Vec<String>,
    /// Plan id and action count, when the plan file parses.
    plan: Option<(String, usize)>,
    /// Configured plan file path.
    plan_file: PathBuf,
}

/// Inspect the config and plan file without failing on either.
fn gather_state(root: &Path) -> CurrentState {
    let config_found = root.join(config::CONFIG_FILE).exists();
    let loaded = Config::load(root).ok();

    let patterns = loaded
        .as_ref()
        .map(|c| return c.patterns.iter().map(|p| return p.id.clone()).collect())
        .unwrap_or_default();
    let plan_file = loaded.map_or_else(|| return Config::default().plan_file, |c| return c.plan_file);
    let plan = planfile::read(&root.join(&plan_file)).ok().map(|p| return (p.id.clone(), p.len()));

    return CurrentState { config_found, patterns, plan, plan_file };
}

// ── Markdown output ───────────────────────────────────────────────────

/// Print the full markdown document.
fn print_markdown(state: &CurrentState) {
    let version = env!("CARGO_PKG_VERSION");
    print_markdown_header(version);
    print_markdown_state(state);
    println!();
    print_markdown_exit_codes();
}

/// Static part of the document: workflow and configuration.
fn print_markdown_header(version: &str) {
    print!(
        "\
# nameplan {version}

Naming-convention scanner and refactor planner. Finds identifiers, paths, and
keys that break your conventions, then plans the renames, edits, and reference
updates in a safe order.

## Workflow

    nameplan scan                 List every naming violation
    nameplan plan                 Build, validate, and write .nameplan.plan.json
    nameplan plan --no-write      Preview the plan without writing it
    nameplan check                Re-validate the written plan (exit 0/1)
    nameplan validate [--fix]     Check env keys, report fields, and CI steps
    nameplan watch                Re-run validate on every change

## Categories

    api  class  config  database  display  environment  file  variable

File and class fixes plan file renames plus reference updates for every
import that names the file; the rest become in-place content edits.

## Configuration (.nameplan.toml)

    include = [\"src/\"]                   # only scan these paths
    exclude = [\"src/generated/\"]         # skip these paths
    max_file_bytes = 1048576

    [[patterns]]
    id = \"env-prefix\"
    category = \"environment\"
    incorrect = ['\\bWRONG_([A-Z_]+)\\b']

    [[patterns.rules]]
    glob = \"*.ts\"                      # most specific glob wins; ties go to the first declared
    replacement = \"APP_$1\"
    severity = \"high\"
    validator = {{ kind = \"context-lacks\", text = \"legacy\" }}

    [validation]
    env_prefix = \"APP_\"
    env_files = [\".env\"]
    report_dir = \"reports\"
    required_report_fields = [\"generated_at\"]
    ci_paths = [\".github/workflows\"]
    required_ci_steps = [\"nameplan validate\"]

## Current State

"
    );
}

/// Print what was found on disk.
fn print_markdown_state(state: &CurrentState) {
    if state.config_found {
        println!("Config:   {} (found)", config::CONFIG_FILE);
    } else {
        println!("Config:   {} (not found)", config::CONFIG_FILE);
    }

    if state.patterns.is_empty() {
        println!("Patterns: (none)");
    } else {
        println!("Patterns: {}", state.patterns.join(", "));
    }

    match &state.plan {
        Some((id, n)) => println!("Plan:     {} ({id}, {n} actions)", state.plan_file.display()),
        None => println!("Plan:     {} (not found)", state.plan_file.display()),
    }
}

/// Print the exit code table.
fn print_markdown_exit_codes() {
    println!("## Exit Codes\n");
    println!("| Code | Meaning |");
    println!("|------|---------|");
    for (code, meaning) in EXIT_CODES {
        println!("| {code}    | {meaning} |");
    }
}

// ── JSON output ───────────────────────────────────────────────────────

/// Top-level JSON document.
#[derive(Serialize)]
struct InfoJson {
    /// Every category name the rules accept.
    categories: Vec<&'static str>,
    /// Current state of the working directory.
    current_state: StateJson,
    /// Exit code table.
    exit_codes: Vec<ExitCodeInfo>,
    /// Crate version.
    version: String,
}

/// One exit code row.
#[derive(Serialize)]
struct ExitCodeInfo {
    /// Process exit status.
    code: u8,
    /// What it means.
    meaning: String,
}

/// JSON view of [`CurrentState`].
#[derive(Serialize)]
struct StateJson {
    /// Whether the config file exists.
    config_found: bool,
    /// Configured pattern ids.
    patterns: Vec<String>,
    /// Action count of the written plan.
    plan_actions: Option<usize>,
    /// Plan file path.
    plan_file: String,
    /// Id of the written plan.
    plan_id: Option<String>,
}

/// Print the document as pretty JSON.
fn print_json(state: &CurrentState) {
    let info = InfoJson {
        categories: CATEGORIES.to_vec(),
        current_state: StateJson {
            config_found: state.config_found,
            patterns: state.patterns.clone(),
            plan_actions: state.plan.as_ref().map(|(_, n)| return *n),
            plan_file: state.plan_file.display().to_string(),
            plan_id: state.plan.as_ref().map(|(id, _)| return id.clone()),
        },
        exit_codes: EXIT_CODES
            .iter()
            .map(|&(code, meaning)| return ExitCodeInfo { code, meaning: meaning.to_string() })
            .collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    // serde_json::to_string_pretty won't fail on this structure.
    let json = serde_json::to_string_pretty(&info).unwrap_or_default();
    println!("{json}");
}
