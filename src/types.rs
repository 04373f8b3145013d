/// Core domain types for nameplan scans: categories, matches, and scan results.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Naming vocabulary a pattern belongs to. Drives how a fix is planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Public HTTP or RPC surface names.
    Api,
    /// Type and class names.
    Class,
    /// Configuration keys.
    Config,
    /// Table and column names.
    Database,
    /// User-visible product strings.
    Display,
    /// Environment variable names.
    Environment,
    /// File and module names.
    File,
    /// Local identifiers.
    Variable,
}

impl Category {
    /// Whether a fix in this category renames something on disk.
    pub const fn implies_rename(self) -> bool {
        return matches!(self, Self::Class | Self::File);
    }

    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::Api => "api",
            Self::Class => "class",
            Self::Config => "config",
            Self::Database => "database",
            Self::Display => "display",
            Self::Environment => "environment",
            Self::File => "file",
            Self::Variable => "variable",
        };
    }
}

/// How loudly a match should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    /// Breaks the naming standard in a way users or integrations see.
    High,
    /// Inconsistent, likely to spread if left alone.
    Medium,
    /// Advisory only.
    Low,
}

impl Severity {
    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        };
    }
}

/// Coarse classification of a scanned file. Context rules and reference
/// detection key off this, never off file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    /// Structured configuration: JSON, YAML, TOML, INI.
    Config,
    /// Prose: Markdown, reStructuredText, plain text.
    Documentation,
    /// Dotenv-style key/value files.
    Environment,
    /// Anything not recognised.
    Other,
    /// Program source in any language.
    Source,
}

impl FileType {
    /// Classify a path by name and extension.
    pub fn from_path(path: &Path) -> Self {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if name == ".env" || name.starts_with(".env.") || name.ends_with(".env") {
            return Self::Environment;
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        return match ext {
            "json" | "yaml" | "yml" | "toml" | "ini" | "cfg" | "conf" => Self::Config,
            "md" | "markdown" | "rst" | "txt" => Self::Documentation,
            "c" | "cc" | "cpp" | "cs" | "go" | "h" | "java" | "js" | "jsx" | "kt" | "mjs" | "cjs"
            | "php" | "py" | "rb" | "rs" | "scala" | "sh" | "sql" | "swift" | "ts" | "tsx" | "vue" => {
                Self::Source
            },
            _ => Self::Other,
        };
    }

    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::Config => "config",
            Self::Documentation => "documentation",
            Self::Environment => "environment",
            Self::Other => "other",
            Self::Source => "source",
        };
    }
}

/// One already-read input file. Reading and filtering happen outside the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Full text of the file.
    pub content: String,
    /// Classification used by context rules.
    pub file_type: FileType,
    /// Path relative to the project root.
    pub path: PathBuf,
}

impl SourceFile {
    /// Build an input file, classifying it from its path.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        let file_type = FileType::from_path(&path);
        return Self { content: content.into(), file_type, path };
    }
}

/// One occurrence of a naming violation. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Vocabulary the violated pattern belongs to.
    pub category: Category,
    /// One-based column, counted in characters.
    pub column: u32,
    /// The full source line, trimmed, for human review.
    pub context: String,
    /// Byte position of the match within `context`.
    pub context_offset: usize,
    /// One-based line number.
    pub line: u32,
    /// Byte offset of the match within the file.
    pub offset: usize,
    /// The exact matched text.
    pub original: String,
    /// Identifier of the pattern that produced this match.
    pub pattern_id: String,
    /// How loudly to report it.
    pub severity: Severity,
    /// Replacement text, absent when no context rule applied.
    pub suggested: Option<String>,
}

impl Match {
    /// Half-open byte range covered by the match.
    pub const fn byte_range(&self) -> std::ops::Range<usize> {
        return self.offset..self.offset.saturating_add(self.original.len());
    }
}

/// All matches found in one file, ordered by offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    /// Classification of the file.
    pub file_type: FileType,
    /// Matches in ascending offset order.
    pub matches: Vec<Match>,
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Full file content at scan time, kept so planned edits carry a backup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
}

/// A file the scanner declined to match, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Human-readable reason: oversized, unreadable.
    pub reason: String,
}

/// Counts over the full match set, computed once after matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Files that were matched (with or without findings).
    pub files_scanned: usize,
    /// Files rejected by the size bound or readability check.
    pub files_skipped: usize,
    /// Issue count per category.
    pub issues_by_category: BTreeMap<Category, usize>,
    /// Issue count per severity.
    pub issues_by_severity: BTreeMap<Severity, usize>,
    /// Every skipped file, in input order.
    pub skipped: Vec<SkippedFile>,
}

/// The scan's complete output. Sole input to the planner; never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Match count per category.
    pub by_category: BTreeMap<Category, usize>,
    /// Files with at least one match, in input order.
    pub files: Vec<FileMatch>,
    /// Every file that was scanned, in input order. Lets the planner see
    /// files that exist but had nothing to report.
    pub inventory: Vec<PathBuf>,
    /// Summary statistics.
    pub summary: ScanSummary,
    /// Total number of matches across all files.
    pub total_matches: usize,
}

impl ScanResult {
    /// Iterate every match paired with the file it was found in.
    pub fn iter_matches(&self) -> impl Iterator<Item = (&FileMatch, &Match)> {
        return self.files.iter().flat_map(|f| f.matches.iter().map(move |m| (f, m)));
    }
}
