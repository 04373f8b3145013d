//! Refactor actions: the three kinds of proposed edit and their rollback data.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::Category;

/// Estimated risk of applying an action. Ordered so `max` is the aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    /// Mechanical edit, nothing else observes it.
    #[default]
    Low,
    /// Touches something other files depend on.
    Medium,
    /// Touches an external contract or many dependents.
    High,
}

impl RiskLevel {
    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
    }
}

/// Discriminant of a refactor action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// In-place text replacements in one file.
    ContentChange,
    /// Move a file to a new path.
    FileRename,
    /// Rewrite one import, require, path, or config reference.
    ReferenceUpdate,
}

impl ActionKind {
    /// Fixed cost in minutes, used for the duration estimate.
    pub const fn cost_minutes(self) -> u32 {
        return match self {
            Self::ContentChange => 2,
            Self::FileRename => 5,
            Self::ReferenceUpdate => 1,
        };
    }

    /// Default scheduling priority; lower runs first among ready actions.
    pub const fn default_priority(self) -> u32 {
        return match self {
            Self::ContentChange => 20,
            Self::FileRename => 10,
            Self::ReferenceUpdate => 30,
        };
    }

    /// Prefix of generated action ids.
    pub const fn id_prefix(self) -> &'static str {
        return match self {
            Self::ContentChange => "content",
            Self::FileRename => "rename",
            Self::ReferenceUpdate => "reference",
        };
    }
}

/// What a reference string is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// A value in a configuration file.
    Config,
    /// An `import` / `export ... from` specifier.
    Import,
    /// A path-like string literal.
    Path,
    /// A `require(...)` argument.
    Require,
}

/// Half-open byte range `[start, end)` within one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TextSpan {
    /// Exclusive end offset.
    pub end: usize,
    /// Inclusive start offset.
    pub start: usize,
}

impl TextSpan {
    /// Span starting at `start` covering `len` bytes.
    pub const fn new(start: usize, len: usize) -> Self {
        return Self { end: start.saturating_add(len), start };
    }

    /// Any shared byte counts; touching ends do not.
    pub const fn overlaps(&self, other: &Self) -> bool {
        return self.start < other.end && other.start < self.end;
    }
}

/// One in-place edit inside a content change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextReplacement {
    /// Category of the match this edit fixes.
    pub category: Category,
    /// One-based column of the original text.
    pub column: u32,
    /// Surrounding line, for review.
    pub context: String,
    /// Byte length of the original text.
    pub length: usize,
    /// One-based line of the original text.
    pub line: u32,
    /// Byte offset of the original text.
    pub offset: usize,
    /// Text being replaced.
    pub original: String,
    /// Text written in its place.
    pub replacement: String,
}

impl TextReplacement {
    /// Byte range this edit overwrites.
    pub const fn span(&self) -> TextSpan {
        return TextSpan::new(self.offset, self.length);
    }
}

/// Everything needed to undo one action after it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RollbackData {
    /// Move `from` back to `to`.
    RenameBack {
        /// Path the file was moved to.
        from: PathBuf,
        /// Path to restore.
        to: PathBuf,
    },
    /// Restore a file's full content. Without a backup, undo each
    /// replacement by writing `original` back over `replacement`.
    RestoreContent {
        /// Full content before the change, when the scan kept it.
        backup: Option<String>,
        /// File to restore.
        file: PathBuf,
    },
    /// Put the old reference string back at `span`.
    RestoreReference {
        /// File holding the reference.
        file: PathBuf,
        /// Reference string to restore.
        reference: String,
        /// Where the new reference sits after the update.
        span: TextSpan,
    },
}

/// Fields every action carries, whatever its kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionHeader {
    /// Ids of actions that must be applied first.
    pub depends_on: Vec<String>,
    /// Estimated risk of applying this action.
    pub estimated_risk: RiskLevel,
    /// Deterministic identity.
    pub id: String,
    /// Scheduling hint; lower runs first among ready actions.
    pub priority: u32,
    /// Undo data.
    pub rollback: RollbackData,
    /// Human-readable "before" descriptor.
    pub source: String,
    /// Human-readable "after" descriptor.
    pub target: String,
}

/// Move a file from `old_path` to `new_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRename {
    /// Shared action fields.
    pub header: ActionHeader,
    /// Destination path.
    pub new_path: PathBuf,
    /// Current path.
    pub old_path: PathBuf,
    /// Files known to reference `old_path`.
    pub referenced_by: Vec<PathBuf>,
    /// Whether references in dependents must be rewritten too.
    pub update_references: bool,
}

/// In-place replacements in one file, ordered by offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentChange {
    /// File to edit, at its post-rename location.
    pub file: PathBuf,
    /// Shared action fields.
    pub header: ActionHeader,
    /// Edits in ascending offset order.
    pub replacements: Vec<TextReplacement>,
}

/// Rewrite one reference string in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceUpdate {
    /// One-based column of the old reference.
    pub column: u32,
    /// File holding the reference, at its post-rename location.
    pub file: PathBuf,
    /// Shared action fields.
    pub header: ActionHeader,
    /// What kind of reference this is.
    pub kind: ReferenceKind,
    /// One-based line of the old reference.
    pub line: u32,
    /// Reference string to write.
    pub new_reference: String,
    /// Reference string currently in the file.
    pub old_reference: String,
    /// Byte range of the old reference.
    pub span: TextSpan,
}

/// Borrowed view over any action, for exhaustive matching.
#[derive(Debug, Clone, Copy)]
pub enum RefactorAction<'a> {
    /// A content change.
    Content(&'a ContentChange),
    /// A reference update.
    Reference(&'a ReferenceUpdate),
    /// A file rename.
    Rename(&'a FileRename),
}

impl<'a> RefactorAction<'a> {
    /// Shared fields.
    pub const fn header(self) -> &'a ActionHeader {
        return match self {
            Self::Content(c) => &c.header,
            Self::Reference(r) => &r.header,
            Self::Rename(r) => &r.header,
        };
    }

    /// Action id.
    pub fn id(self) -> &'a str {
        return self.header().id.as_str();
    }

    /// Discriminant.
    pub const fn kind(self) -> ActionKind {
        return match self {
            Self::Content(_) => ActionKind::ContentChange,
            Self::Reference(_) => ActionKind::ReferenceUpdate,
            Self::Rename(_) => ActionKind::FileRename,
        };
    }

    /// The file this action is about: the edited file, or the rename source.
    pub fn primary_path(self) -> &'a Path {
        return match self {
            Self::Content(c) => &c.file,
            Self::Reference(r) => &r.file,
            Self::Rename(r) => &r.old_path,
        };
    }

    /// Every file path this action reads or writes.
    pub fn touched_files(self) -> Vec<&'a Path> {
        return match self {
            Self::Content(c) => vec![c.file.as_path()],
            Self::Reference(r) => vec![r.file.as_path()],
            Self::Rename(r) => vec![r.old_path.as_path(), r.new_path.as_path()],
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_half_open() {
        let a = TextSpan::new(10, 10);
        assert!(a.overlaps(&TextSpan::new(15, 10)));
        assert!(TextSpan::new(15, 10).overlaps(&a));
        assert!(!a.overlaps(&TextSpan::new(20, 5)));
        assert!(!TextSpan::new(5, 5).overlaps(&a));
    }

    #[test]
    fn risk_levels_order_low_to_high() {
        let max = [RiskLevel::Medium, RiskLevel::Low, RiskLevel::High].into_iter().max();
        assert_eq!(max, Some(RiskLevel::High));
    }

    #[test]
    fn rollback_data_is_tagged() {
        let data = RollbackData::RenameBack { from: PathBuf::from("b.ts"), to: PathBuf::from("a.ts") };
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["kind"], "rename-back");
    }
}
