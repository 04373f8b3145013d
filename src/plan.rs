//! The refactor plan aggregate and the result of validating one.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::actions::{ContentChange, FileRename, RefactorAction, ReferenceUpdate, RiskLevel};
use crate::conflicts::ConflictInfo;
use crate::graph::DependencyKind;

/// One action's prerequisites and why they exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDependency {
    /// The dependent action.
    pub action_id: String,
    /// Prerequisite action ids.
    pub depends_on: Vec<String>,
    /// Reason shared by these prerequisites.
    pub kind: DependencyKind,
}

/// Aggregate facts about a plan, recomputed by `optimize_plan`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanMetadata {
    /// Whether a backup must be taken before applying.
    pub backup_required: bool,
    /// Sum of fixed per-kind costs, in minutes.
    pub estimated_duration_minutes: u32,
    /// Highest risk across all actions.
    pub risk_level: RiskLevel,
    /// Whether the project's tests must run after applying.
    pub testing_required: bool,
    /// Number of actions across all three collections.
    pub total_actions: usize,
}

/// The full, dependency-ordered, conflict-annotated set of actions.
///
/// Treated as a value between pipeline stages: planner operations return a
/// new plan rather than mutating one in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefactorPlan {
    /// Detected conflicts.
    pub conflicts: Vec<ConflictInfo>,
    /// Content changes, in declaration order.
    pub content_changes: Vec<ContentChange>,
    /// Advisory creation time.
    pub created_at: DateTime<Utc>,
    /// Prerequisites per action.
    pub dependencies: Vec<PlanDependency>,
    /// Action ids in the order they are safe to apply.
    pub execution_order: Vec<String>,
    /// Files that existed when the plan was made.
    pub existing_files: Vec<PathBuf>,
    /// Deterministic plan id.
    pub id: String,
    /// Aggregate facts.
    pub metadata: PlanMetadata,
    /// Reference updates, in declaration order.
    pub reference_updates: Vec<ReferenceUpdate>,
    /// File renames, in declaration order.
    pub renames: Vec<FileRename>,
}

impl RefactorPlan {
    /// Every action in declaration order: renames, content changes, reference updates.
    pub fn actions(&self) -> Vec<RefactorAction<'_>> {
        self.renames
            .iter()
            .map(RefactorAction::Rename)
            .chain(self.content_changes.iter().map(RefactorAction::Content))
            .chain(self.reference_updates.iter().map(RefactorAction::Reference))
            .collect()
    }

    /// Look up one action by id.
    pub fn action(&self, id: &str) -> Option<RefactorAction<'_>> {
        self.actions().into_iter().find(|a| a.id() == id)
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.renames.len() + self.content_changes.len() + self.reference_updates.len()
    }

    /// Whether the plan has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Machine-readable code of a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    /// Actions depend on each other in a loop.
    CircularDependency,
    /// Two renames share a destination.
    DuplicateTarget,
    /// The plan itself is malformed.
    InvalidInput,
    /// A `depends_on` id names no action in the plan.
    UnknownDependency,
}

impl ErrorCode {
    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::CircularDependency => "circular-dependency",
            Self::DuplicateTarget => "duplicate-target",
            Self::InvalidInput => "invalid-input",
            Self::UnknownDependency => "unknown-dependency",
        }
    }
}

/// Severity of a blocking finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueSeverity {
    /// The plan is malformed; nothing else about it can be trusted.
    Critical,
    /// The plan cannot be executed as-is.
    Error,
}

/// A finding that blocks execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    /// Primary action the finding is about; empty for plan-level findings.
    pub action_id: String,
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Every action involved, including `action_id`.
    pub related_actions: Vec<String>,
    /// Severity.
    pub severity: IssueSeverity,
}

/// A finding surfaced for human judgment that does not block execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Action the finding is about.
    pub action_id: String,
    /// Human-readable description.
    pub message: String,
    /// What to do about it.
    pub suggestion: String,
}

/// Outcome of validating a plan. A pure function of the plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Blocking findings.
    pub errors: Vec<ValidationError>,
    /// True when `errors` is empty.
    pub is_valid: bool,
    /// Free-form advice.
    pub suggestions: Vec<String>,
    /// Advisory findings.
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    /// Process exit status for CLI integration: 0 valid, 1 invalid.
    pub const fn exit_code(&self) -> u8 {
        if self.is_valid { 0 } else { 1 }
    }
}
