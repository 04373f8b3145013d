//! Project-wide scanning: match every input file and aggregate the results.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::matcher;
use crate::rules::RuleSet;
use crate::types::{FileMatch, ScanResult, ScanSummary, SkippedFile, SourceFile};

/// Predicate deciding whether a file's content is readable text.
pub type ReadableCheck = Arc<dyn Fn(&SourceFile) -> bool + Send + Sync>;

/// Caller-supplied guards applied before a file is matched.
#[derive(Clone)]
pub struct ScanOptions {
    /// Keep each matched file's full content on its `FileMatch` so that
    /// planned content changes carry a restorable backup.
    pub keep_snapshots: bool,
    /// Files larger than this many bytes are skipped.
    pub max_file_bytes: Option<u64>,
    /// Files failing this check are skipped. Defaults to "no NUL bytes".
    pub readable: ReadableCheck,
}

impl Default for ScanOptions {
    fn default() -> Self {
        return Self {
            keep_snapshots: true,
            max_file_bytes: None,
            readable: Arc::new(|file: &SourceFile| !file.content.contains('\0')),
        };
    }
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("ScanOptions")
            .field("keep_snapshots", &self.keep_snapshots)
            .field("max_file_bytes", &self.max_file_bytes)
            .finish_non_exhaustive();
    }
}

/// Outcome of looking at one file.
enum FileOutcome {
    Scanned(Option<FileMatch>),
    Skipped(SkippedFile),
}

/// Runs a rule set over a file set.
pub struct Scanner<'r> {
    options: ScanOptions,
    rules: &'r RuleSet,
}

impl<'r> Scanner<'r> {
    /// A scanner with default options.
    pub fn new(rules: &'r RuleSet) -> Self {
        return Self { options: ScanOptions::default(), rules };
    }

    /// A scanner with explicit options.
    pub const fn with_options(rules: &'r RuleSet, options: ScanOptions) -> Self {
        return Self { options, rules };
    }

    /// Scan every file. Oversized or unreadable files are counted as skipped,
    /// never fatal. Files are matched in parallel; the result follows input
    /// order then in-file offset order, so it is identical run to run.
    pub fn scan(&self, files: &[SourceFile]) -> ScanResult {
        let outcomes: Vec<FileOutcome> = files.par_iter().map(|file| self.scan_file(file)).collect();

        let mut result = ScanResult::default();
        let mut skipped = Vec::new();
        for (file, outcome) in files.iter().zip(outcomes) {
            match outcome {
                FileOutcome::Scanned(found) => {
                    result.inventory.push(file.path.clone());
                    if let Some(file_match) = found {
                        result.files.push(file_match);
                    }
                },
                FileOutcome::Skipped(skip) => skipped.push(skip),
            }
        }

        result.summary = summarize(&result.files, result.inventory.len(), skipped);
        result.by_category = result.summary.issues_by_category.clone();
        result.total_matches = result.files.iter().map(|f| f.matches.len()).sum();

        tracing::info!(
            scanned = result.summary.files_scanned,
            skipped = result.summary.files_skipped,
            matches = result.total_matches,
            "scan complete"
        );
        return result;
    }

    fn scan_file(&self, file: &SourceFile) -> FileOutcome {
        let size: u64 = file.content.len().try_into().unwrap_or(u64::MAX);
        if let Some(max) = self.options.max_file_bytes
            && size > max
        {
            tracing::debug!(path = %file.path.display(), size, max, "skipping oversized file");
            return FileOutcome::Skipped(SkippedFile {
                path: file.path.clone(),
                reason: format!("oversized ({size} bytes, max {max})"),
            });
        }

        if !(self.options.readable)(file) {
            tracing::debug!(path = %file.path.display(), "skipping unreadable file");
            return FileOutcome::Skipped(SkippedFile {
                path: file.path.clone(),
                reason: "unreadable".to_string(),
            });
        }

        let matches = matcher::match_content(&file.path, &file.content, &self.rules.patterns);
        if matches.is_empty() {
            return FileOutcome::Scanned(None);
        }

        return FileOutcome::Scanned(Some(FileMatch {
            file_type: file.file_type,
            matches,
            path: file.path.clone(),
            snapshot: self.options.keep_snapshots.then(|| file.content.clone()),
        }));
    }
}

/// Category and severity counts over the full match set, computed in one
/// pass at the end so the numbers never depend on scan order.
fn summarize(files: &[FileMatch], scanned: usize, skipped: Vec<SkippedFile>) -> ScanSummary {
    let mut issues_by_category = BTreeMap::new();
    let mut issues_by_severity = BTreeMap::new();
    for m in files.iter().flat_map(|f| &f.matches) {
        *issues_by_category.entry(m.category).or_insert(0_usize) += 1;
        *issues_by_severity.entry(m.severity).or_insert(0_usize) += 1;
    }

    ScanSummary {
        files_scanned: scanned,
        files_skipped: skipped.len(),
        issues_by_category,
        issues_by_severity,
        skipped,
    }
}
