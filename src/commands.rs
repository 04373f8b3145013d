//! Core CLI commands for nameplan: scan, plan, check, validate, info.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use walkdir::WalkDir;

use crate::actions::RefactorAction;
use crate::config::{self, Config};
use crate::diagnostics;
use crate::error;
use crate::files;
use crate::plan::{RefactorPlan, ValidationResult};
use crate::planfile;
use crate::planner;
use crate::runner::{self, CiDocument, EnvEntry, ReportDocument, RunInput};
use crate::scanner::{ScanOptions, Scanner};
use crate::types::ScanResult;

/// Check a persisted plan again without rescanning.
///
/// # Errors
///
/// Returns errors from config loading or plan reading.
pub fn check(plan_path: Option<&Path>) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let path = match plan_path {
        Some(p) => p.to_path_buf(),
        None => root.join(Config::load(&root)?.plan_file),
    };

    let plan = planfile::read(&path)?;
    let verdict = planner::validate_plan(&plan);
    diagnostics::print_markdown(&diagnostics::render_validation(&verdict));

    let state = if verdict.is_valid { "valid" } else { "invalid" };
    println!(
        "{} {state}: {} actions, {} errors, {} warnings",
        plan.id,
        plan.len(),
        verdict.errors.len(),
        verdict.warnings.len()
    );
    return Ok(exit_for(&verdict));
}

/// Describe one action on a single line.
fn describe(action: RefactorAction<'_>) -> String {
    return match action {
        RefactorAction::Content(change) => {
            format!("edit    {} ({} replacements)", change.file.display(), change.replacements.len())
        },
        RefactorAction::Reference(update) => format!(
            "update  {}:{}  {} -> {}",
            update.file.display(),
            update.line,
            update.old_reference,
            update.new_reference
        ),
        RefactorAction::Rename(rename) => {
            format!("rename  {} -> {}", rename.old_path.display(), rename.new_path.display())
        },
    };
}

/// Exit 0 for a valid plan, 1 otherwise.
fn exit_for(verdict: &ValidationResult) -> ExitCode {
    return ExitCode::from(verdict.exit_code());
}

/// Files under `path` (itself, if a file) with one of `extensions`,
/// relative to `root` and sorted. A missing path yields nothing.
fn files_with_extensions(root: &Path, path: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    return WalkDir::new(root.join(path))
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| return e.file_type().is_file())
        .filter(|e| {
            return e
                .path()
                .extension()
                .and_then(|ext| return ext.to_str())
                .is_some_and(|ext| return extensions.contains(&ext));
        })
        .map(|e| return e.path().strip_prefix(root).unwrap_or(e.path()).to_path_buf())
        .collect();
}

/// Read the validation runner's inputs from the files `[validation]` names.
///
/// # Errors
///
/// Returns `Error::FileNotFound` for a missing env file, `Error::ParseFailed`
/// for an unparsable env file or report, or `Error::Io` for read failures.
fn gather_run_input(root: &Path, config: &Config, fix: bool) -> Result<RunInput, error::Error> {
    let settings = &config.validation;
    let mut input = RunInput::default();

    if let Some(prefix) = &settings.env_prefix {
        let mut entries = Vec::new();
        for file in &settings.env_files {
            entries.extend(read_env_file(root, file)?);
        }
        input.env = Some((entries, prefix.clone()));
    }

    if let Some(dir) = &settings.report_dir {
        let mut documents = Vec::new();
        for path in files_with_extensions(root, dir, &["json"]) {
            let content = std::fs::read_to_string(root.join(&path))?;
            let value = serde_json::from_str(&content)
                .map_err(|e| return error::Error::ParseFailed { file: path.clone(), reason: e.to_string() })?;
            documents.push(ReportDocument { changed: false, path, value });
        }
        input.reports = Some((documents, settings.required_report_fields.clone(), fix));
    }

    if !settings.ci_paths.is_empty() || !settings.required_ci_steps.is_empty() {
        let mut documents = Vec::new();
        for ci_path in &settings.ci_paths {
            for path in files_with_extensions(root, ci_path, &["yml", "yaml"]) {
                let content = std::fs::read_to_string(root.join(&path))?;
                documents.push(CiDocument { content, path });
            }
        }
        input.ci = Some((documents, settings.required_ci_steps.clone()));
    }

    return Ok(input);
}

/// Output a comprehensive reference document for nameplan.
pub fn info(json: bool) {
    return crate::info::run(json);
}

/// Scan, plan, validate, and (when valid) optimize; write the plan file.
/// An invalid plan is still written so `check` can report on it.
///
/// # Errors
///
/// Returns errors from config loading, file collection, planning, or plan writing.
pub fn plan(json: bool, write: bool) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let scan = scan_project(&root, &config, true)?;

    let draft = planner::create_plan(&scan)?;
    let verdict = planner::validate_plan(&draft);
    let plan = if verdict.is_valid { planner::optimize_plan(&draft)? } else { draft };

    if write {
        planfile::write(&plan, &root.join(&config.plan_file))?;
    }

    if json {
        println!("{}", planfile::serialize(&plan)?.trim_end());
    } else {
        print_plan_summary(&plan);
        if write {
            println!("Wrote {}", config.plan_file.display());
        }
    }
    diagnostics::print_markdown(&diagnostics::render_validation(&verdict));
    return Ok(exit_for(&verdict));
}

/// Print the execution order and aggregate facts of a plan.
fn print_plan_summary(plan: &RefactorPlan) {
    let meta = &plan.metadata;
    println!(
        "{}: {} actions, ~{} min, risk {}",
        plan.id,
        meta.total_actions,
        meta.estimated_duration_minutes,
        meta.risk_level.label()
    );

    for (step, id) in plan.execution_order.iter().enumerate() {
        let Some(action) = plan.action(id) else { continue };
        println!("{:>4}. {id}  {}", step.saturating_add(1), describe(action));
    }

    for conflict in &plan.conflicts {
        println!(
            "CONFLICT  {} ({})  {}",
            conflict.conflict_type.label(),
            conflict.severity.label(),
            conflict.description
        );
    }
    if meta.backup_required {
        println!("Backup required before applying.");
    }
}

/// Read one dotenv file into entries, in file order.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if the file is missing,
/// or `Error::ParseFailed` for a malformed line.
fn read_env_file(root: &Path, file: &Path) -> Result<Vec<EnvEntry>, error::Error> {
    let path = root.join(file);
    if !path.is_file() {
        return Err(error::Error::FileNotFound { path });
    }
    let iter = dotenv::from_path_iter(&path)
        .map_err(|e| return error::Error::ParseFailed { file: file.to_path_buf(), reason: e.to_string() })?;

    let mut entries = Vec::new();
    for item in iter {
        let (key, value) =
            item.map_err(|e| return error::Error::ParseFailed { file: file.to_path_buf(), reason: e.to_string() })?;
        entries.push(EnvEntry { key, source: file.to_path_buf(), value });
    }
    return Ok(entries);
}

/// Collect and scan the project as configured.
///
/// # Errors
///
/// Returns rule compilation errors or file read errors.
fn scan_project(root: &Path, config: &Config, keep_snapshots: bool) -> Result<ScanResult, error::Error> {
    let rules = config.rule_set()?;
    if rules.is_empty() {
        tracing::warn!(config = config::CONFIG_FILE, "no naming patterns configured");
    }
    let sources = files::collect(root, config)?;
    let options = ScanOptions { keep_snapshots, max_file_bytes: config.max_file_bytes, ..ScanOptions::default() };
    return Ok(Scanner::with_options(&rules, options).scan(&sources));
}

/// Scan the project and list every match. Always exits 0.
///
/// # Errors
///
/// Returns errors from config loading, rule compilation, or file reading.
pub fn scan(json: bool) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let result = scan_project(&root, &config, false)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(ExitCode::SUCCESS);
    }

    for (file, m) in result.iter_matches() {
        let fix = m.suggested.as_deref().map_or_else(String::new, |s| return format!(" -> {s}"));
        println!(
            "{}:{}:{}  {:<6}  {:<11}  {}{fix}",
            file.path.display(),
            m.line,
            m.column,
            m.severity.label(),
            m.category.label(),
            m.original
        );
    }

    let summary = &result.summary;
    if result.total_matches > 0 {
        println!();
    }
    println!(
        "{} matches in {} files ({} scanned, {} skipped)",
        result.total_matches,
        result.files.len(),
        summary.files_scanned,
        summary.files_skipped
    );
    return Ok(ExitCode::SUCCESS);
}

/// Run the validation runner over the configured env files, reports, and
/// CI configuration. With `fix`, auto-fixed reports are written back.
///
/// # Errors
///
/// Returns `Error::ConfigNotFound` without a config file, otherwise errors
/// from config loading, input reading, or report writing.
pub fn validate(fix: bool, json: bool) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");
    let config_path = root.join(config::CONFIG_FILE);
    if !config_path.exists() {
        return Err(error::Error::ConfigNotFound { path: config_path });
    }
    let config = Config::load(&root)?;
    let mut input = gather_run_input(&root, &config, fix)?;
    let report = runner::run_all(&mut input);

    if let Some((documents, _, _)) = &input.reports {
        for document in documents.iter().filter(|d| return d.changed) {
            write_report(&root, document)?;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        diagnostics::print_markdown(&diagnostics::render_run_report(&report));
    }
    return Ok(ExitCode::from(report.exit_code()));
}

/// Write an auto-fixed report back to disk as pretty JSON.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails, or `Error::Io` on write failure.
fn write_report(root: &Path, document: &ReportDocument) -> Result<(), error::Error> {
    let mut content = serde_json::to_string_pretty(&document.value)?;
    content.push('\n');
    std::fs::write(root.join(&document.path), content)?;
    eprintln!("fixed: {}", document.path.display());
    return Ok(());
}
