//! Plan persistence: JSON serialization with structural checks on load.

use std::collections::HashSet;
use std::path::Path;

use crate::error::Error;
use crate::plan::RefactorPlan;

/// Parse a plan from JSON content.
///
/// # Errors
///
/// Returns `Error::Json` if the content is not a valid plan document,
/// or `Error::PlanCorrupt` if it parsed but is internally inconsistent.
pub fn parse(content: &str) -> Result<RefactorPlan, Error> {
    let plan: RefactorPlan = serde_json::from_str(content)?;
    enforce_plan_consistency(&plan)?;
    return Ok(plan);
}

/// Read and parse a plan from disk.
///
/// # Errors
///
/// Returns `Error::PlanNotFound` if the file doesn't exist,
/// `Error::Io` for other read failures,
/// `Error::Json` if the content is invalid JSON,
/// or `Error::PlanCorrupt` if the plan is inconsistent.
pub fn read(path: &Path) -> Result<RefactorPlan, Error> {
    let content = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::PlanNotFound { path: path.to_path_buf() });
        },
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };
    tracing::debug!(path = %path.display(), bytes = content.len(), "read plan file");
    return parse(&content);
}

/// Serialize to pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn serialize(plan: &RefactorPlan) -> Result<String, Error> {
    let mut content = serde_json::to_string_pretty(plan)?;
    content.push('\n');
    return Ok(content);
}

/// Write the plan to disk.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails,
/// or `Error::Io` if the file cannot be written.
pub fn write(plan: &RefactorPlan, path: &Path) -> Result<(), Error> {
    let content = serialize(plan)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), plan = %plan.id, "wrote plan file");
    return Ok(());
}

/// A persisted plan must have unique action ids and an execution order
/// naming only those ids. Deeper problems are left to `validate_plan`.
///
/// # Errors
///
/// Returns `Error::PlanCorrupt` naming the first inconsistency.
fn enforce_plan_consistency(plan: &RefactorPlan) -> Result<(), Error> {
    let mut ids = HashSet::new();
    for action in plan.actions() {
        if !ids.insert(action.id()) {
            return Err(Error::PlanCorrupt { reason: format!("duplicate action id {}", action.id()) });
        }
    }

    if let Some(unknown) = plan.execution_order.iter().find(|id| return !ids.contains(id.as_str())) {
        return Err(Error::PlanCorrupt { reason: format!("execution order names unknown action {unknown}") });
    }
    return Ok(());
}
