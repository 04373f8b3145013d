//! Validation runner: naming checks over environment files, generated
//! reports, and CI configuration, merged into one pass/fail verdict.
//!
//! Each check is a pure function over already-read documents. Reading files
//! and writing auto-fixed reports back is the CLI's job.

use std::path::PathBuf;

use heck::{ToKebabCase as _, ToShoutySnakeCase as _, ToSnakeCase as _};
use serde::Serialize;
use serde_json::{Map, Value};

/// Which check produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    /// CI configuration presence.
    Ci,
    /// Environment variable naming.
    Environment,
    /// Generated report naming and schema.
    Reports,
}

impl CheckKind {
    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::Ci => "ci",
            Self::Environment => "environment",
            Self::Reports => "reports",
        };
    }
}

/// Whether a finding fails the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingLevel {
    /// Fails the run.
    Error,
    /// Reported only.
    Warning,
}

/// One problem found by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// Machine-readable code, e.g. `env-prefix`.
    pub code: &'static str,
    /// Error or warning.
    pub level: FindingLevel,
    /// File (and key) the finding is about.
    pub location: String,
    /// Human-readable description.
    pub message: String,
    /// Suggested fix, when there is an obvious one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Finding {
    fn error(code: &'static str, location: impl Into<String>, message: String) -> Self {
        return Self { code, level: FindingLevel::Error, location: location.into(), message, suggestion: None };
    }

    fn warning(code: &'static str, location: impl Into<String>, message: String) -> Self {
        return Self { code, level: FindingLevel::Warning, location: location.into(), message, suggestion: None };
    }

    fn suggest(mut self, suggestion: String) -> Self {
        self.suggestion = Some(suggestion);
        return self;
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Which check ran.
    pub check: CheckKind,
    /// Problems found, in input order.
    pub findings: Vec<Finding>,
    /// Auto-fixes applied, one line each.
    pub fixed: Vec<String>,
}

impl CheckReport {
    const fn new(check: CheckKind) -> Self {
        return Self { check, findings: Vec::new(), fixed: Vec::new() };
    }

    /// True when no finding is an error.
    pub fn passed(&self) -> bool {
        return !self.findings.iter().any(|f| return f.level == FindingLevel::Error);
    }
}

/// Merged outcome of every check that ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Per-check reports, in run order.
    pub checks: Vec<CheckReport>,
    /// True when every check passed.
    pub passed: bool,
}

impl RunReport {
    /// Process exit status: 0 valid, 1 invalid.
    pub const fn exit_code(&self) -> u8 {
        return if self.passed { 0 } else { 1 };
    }

    /// Total number of findings at `level`.
    pub fn count(&self, level: FindingLevel) -> usize {
        return self.checks.iter().flat_map(|c| &c.findings).filter(|f| return f.level == level).count();
    }
}

/// One `KEY=value` pair from an env-like file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    /// Variable name.
    pub key: String,
    /// File it came from.
    pub source: PathBuf,
    /// Variable value.
    pub value: String,
}

/// One generated report, already parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    /// Set when an auto-fix rewrote `value`.
    pub changed: bool,
    /// Where the report lives.
    pub path: PathBuf,
    /// Parsed JSON body.
    pub value: Value,
}

/// One CI configuration file, unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiDocument {
    /// Raw YAML.
    pub content: String,
    /// Where the file lives.
    pub path: PathBuf,
}

/// Input to [`run_all`]. A `None` section is not checked.
#[derive(Debug, Default)]
pub struct RunInput {
    /// CI documents and the steps each project must run.
    pub ci: Option<(Vec<CiDocument>, Vec<String>)>,
    /// Env entries and the prefix every key must carry.
    pub env: Option<(Vec<EnvEntry>, String)>,
    /// Report documents, required fields, and whether to auto-fix.
    pub reports: Option<(Vec<ReportDocument>, Vec<String>, bool)>,
}

/// Check environment variable names: each key carries `prefix` and is
/// SCREAMING_SNAKE_CASE. Empty values are warnings.
pub fn check_env(entries: &[EnvEntry], prefix: &str) -> CheckReport {
    let mut report = CheckReport::new(CheckKind::Environment);
    for entry in entries {
        let location = format!("{}: {}", entry.source.display(), entry.key);

        if !entry.key.starts_with(prefix) {
            let suggested = format!("{prefix}{}", entry.key.to_shouty_snake_case());
            report.findings.push(
                Finding::error("env-prefix", &location, format!("`{}` does not start with `{prefix}`", entry.key))
                    .suggest(suggested),
            );
        }
        if entry.key != entry.key.to_shouty_snake_case() {
            report.findings.push(
                Finding::error("env-format", &location, format!("`{}` is not SCREAMING_SNAKE_CASE", entry.key))
                    .suggest(entry.key.to_shouty_snake_case()),
            );
        }
        if entry.value.trim().is_empty() {
            report.findings.push(Finding::warning("env-empty-value", &location, format!("`{}` has no value", entry.key)));
        }
    }
    tracing::debug!(entries = entries.len(), findings = report.findings.len(), "environment check");
    return report;
}

/// Check generated reports: every required top-level field is present, keys
/// are snake_case, file names are kebab-case.
///
/// With `fix`, a missing required field is restored by renaming the one key
/// whose snake_case form equals it (`generatedAt` → `generated_at`).
pub fn check_reports(documents: &mut [ReportDocument], required: &[String], fix: bool) -> CheckReport {
    let mut report = CheckReport::new(CheckKind::Reports);
    for document in documents.iter_mut() {
        let file = document.path.display().to_string();

        if let Some(stem) = document.path.file_stem().and_then(|s| return s.to_str())
            && stem != stem.to_kebab_case()
        {
            report.findings.push(
                Finding::warning("report-file-name", &file, format!("file name `{stem}` is not kebab-case"))
                    .suggest(stem.to_kebab_case()),
            );
        }

        let Some(object) = document.value.as_object_mut() else {
            report.findings.push(Finding::error("report-missing-field", &file, "report is not a JSON object".to_string()));
            continue;
        };

        let missing: Vec<&String> = required.iter().filter(|f| return !object.contains_key(f.as_str())).collect();
        for field in missing {
            if fix && let Some(from) = rename_to_field(object, field) {
                document.changed = true;
                report.fixed.push(format!("{file}: `{from}` -> `{field}`"));
                continue;
            }
            report.findings.push(
                Finding::error("report-missing-field", &file, format!("required field `{field}` is missing"))
                    .suggest(format!("add `{field}`")),
            );
        }

        let mut keys = Vec::new();
        collect_keys(&document.value, "", &mut keys);
        for (path, key) in keys.into_iter().filter(|(_, key)| return *key != key.to_snake_case()) {
            report.findings.push(
                Finding::warning("report-field-name", format!("{file}: {path}"), format!("key `{key}` is not snake_case"))
                    .suggest(key.to_snake_case()),
            );
        }
    }
    tracing::debug!(documents = documents.len(), findings = report.findings.len(), "report check");
    return report;
}

/// Rename the single key whose snake_case form is `field`. Returns the old key.
fn rename_to_field(object: &mut Map<String, Value>, field: &str) -> Option<String> {
    let from = object.keys().find(|k| return k.as_str() != field && k.to_snake_case() == field)?.clone();
    let value = object.remove(&from)?;
    object.insert(field.to_string(), value);
    return Some(from);
}

/// Every object key with its dotted path, depth first.
fn collect_keys(value: &Value, prefix: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                out.push((path.clone(), key.clone()));
                collect_keys(child, &path, out);
            }
        },
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_keys(child, &format!("{prefix}[{i}]"), out);
            }
        },
        Value::Bool(_) | Value::Null | Value::Number(_) | Value::String(_) => {},
    }
}

/// Check CI configuration: at least one document exists, each parses as
/// YAML, and every required step appears in some step's `name`, `run`, or
/// `uses`.
pub fn check_ci(documents: &[CiDocument], required_steps: &[String]) -> CheckReport {
    let mut report = CheckReport::new(CheckKind::Ci);
    if documents.is_empty() {
        report.findings.push(Finding::error("ci-missing-config", "ci", "no CI configuration found".to_string()));
        return report;
    }

    let mut steps = Vec::new();
    for document in documents {
        match serde_yml::from_str::<serde_yml::Value>(&document.content) {
            Ok(value) => collect_steps(&value, &mut steps),
            Err(e) => report.findings.push(Finding::error(
                "ci-invalid-config",
                document.path.display().to_string(),
                format!("not valid YAML: {e}"),
            )),
        }
    }

    for required in required_steps {
        if !steps.iter().any(|s| return s.contains(required.as_str())) {
            report.findings.push(
                Finding::error("ci-missing-step", "ci", format!("no CI step runs `{required}`"))
                    .suggest(format!("add a step with `run: {required}`")),
            );
        }
    }
    tracing::debug!(documents = documents.len(), steps = steps.len(), "ci check");
    return report;
}

/// Strings under `name`, `run`, and `uses` of every item in a `steps` list.
fn collect_steps(value: &serde_yml::Value, out: &mut Vec<String>) {
    match value {
        serde_yml::Value::Mapping(map) => {
            for (key, child) in map {
                if key.as_str() == Some("steps")
                    && let Some(items) = child.as_sequence()
                {
                    for item in items {
                        for field in ["name", "run", "uses"] {
                            if let Some(text) = item.get(field).and_then(serde_yml::Value::as_str) {
                                out.push(text.to_string());
                            }
                        }
                    }
                }
                collect_steps(child, out);
            }
        },
        serde_yml::Value::Sequence(items) => {
            for item in items {
                collect_steps(item, out);
            }
        },
        serde_yml::Value::Tagged(tagged) => collect_steps(&tagged.value, out),
        serde_yml::Value::Bool(_)
        | serde_yml::Value::Null
        | serde_yml::Value::Number(_)
        | serde_yml::Value::String(_) => {},
    }
}

/// Run every configured check and merge the verdicts.
pub fn run_all(input: &mut RunInput) -> RunReport {
    let mut checks = Vec::new();
    if let Some((entries, prefix)) = &input.env {
        checks.push(check_env(entries, prefix));
    }
    if let Some((documents, required, fix)) = &mut input.reports {
        checks.push(check_reports(documents, required, *fix));
    }
    if let Some((documents, steps)) = &input.ci {
        checks.push(check_ci(documents, steps));
    }

    let passed = checks.iter().all(CheckReport::passed);
    if !passed {
        tracing::warn!(failed = checks.iter().filter(|c| return !c.passed()).count(), "validation failed");
    }
    return RunReport { checks, passed };
}
