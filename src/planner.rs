//! Refactor planning: turn a scan into an ordered, conflict-annotated plan.
//!
//! `create_plan` drafts actions from every fixable match, `validate_plan`
//! judges a plan without changing it, and `optimize_plan` recomputes the
//! execution order of a plan that validated cleanly. None of them perform I/O.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::Utc;
use heck::{ToKebabCase as _, ToLowerCamelCase as _, ToShoutySnakeCase as _, ToSnakeCase as _, ToUpperCamelCase as _};

use crate::actions::{
    ActionHeader, ActionKind, ContentChange, FileRename, RefactorAction, ReferenceKind, ReferenceUpdate, RiskLevel,
    RollbackData, TextReplacement, TextSpan,
};
use crate::conflicts::{self, ConflictInfo, ConflictType};
use crate::error::Error;
use crate::graph::{self, DependencyGraph, DependencyKind};
use crate::ids;
use crate::matcher::LineIndex;
use crate::plan::{
    ErrorCode, IssueSeverity, PlanDependency, PlanMetadata, RefactorPlan, ValidationError, ValidationResult,
    ValidationWarning,
};
use crate::types::{Category, FileMatch, FileType, Match, ScanResult};

/// A content change with more replacements than this is medium risk.
const CONTENT_MEDIUM_REPLACEMENTS: usize = 3;

/// A rename referenced by at least this many files is high risk.
const RENAME_HIGH_REFERENCES: usize = 3;

/// A reference string located inside one line of one file.
struct ReferenceSite {
    /// One-based column of the reference string.
    column: u32,
    /// What kind of reference this is.
    kind: ReferenceKind,
    /// Reference string as written.
    literal: String,
    /// Reference string with the fix applied.
    new_literal: String,
    /// File byte range of `literal`.
    span: TextSpan,
}

/// A rename being collected from one or more matches.
struct RenameDraft {
    /// Destination path.
    new_path: PathBuf,
    /// Current path.
    old_path: PathBuf,
    /// Importers seen so far, in discovery order.
    referenced_by: Vec<PathBuf>,
}

/// A reference update waiting for its rename to be finalized.
struct ReferenceDraft {
    /// Original path of the file holding the reference.
    importer: PathBuf,
    /// One-based line of the reference.
    line: u32,
    /// Index of the rename this reference follows.
    rename: usize,
    /// Where and what the reference is.
    site: ReferenceSite,
}

/// Action drafts accumulated over one pass of the scan.
#[derive(Default)]
struct Drafts<'s> {
    /// Per file, the matches to fix in place.
    content: Vec<(&'s FileMatch, Vec<&'s Match>)>,
    /// Reference updates, in discovery order.
    references: Vec<ReferenceDraft>,
    /// `(importer, span start)` pairs already drafted.
    reference_sites: HashSet<(PathBuf, usize)>,
    /// Old path → index into `renames`.
    rename_index: HashMap<PathBuf, usize>,
    /// Renames, in discovery order. One per old path.
    renames: Vec<RenameDraft>,
}

impl Drafts<'_> {
    /// Record a rename, merging with an earlier one of the same old path.
    fn rename(&mut self, old_path: PathBuf, new_path: PathBuf, importer: Option<&Path>) -> usize {
        let idx = match self.rename_index.get(&old_path) {
            Some(idx) => *idx,
            None => {
                let idx = self.renames.len();
                self.rename_index.insert(old_path.clone(), idx);
                self.renames.push(RenameDraft { new_path, old_path, referenced_by: Vec::new() });
                idx
            },
        };
        if let Some(importer) = importer
            && let Some(draft) = self.renames.get_mut(idx)
            && !draft.referenced_by.iter().any(|p| p == importer)
        {
            draft.referenced_by.push(importer.to_path_buf());
        }
        return idx;
    }
}

/// Graph-derived fields of a plan, recomputed together.
struct Derived {
    /// Detected conflicts.
    conflicts: Vec<ConflictInfo>,
    /// Prerequisites per action.
    dependencies: Vec<PlanDependency>,
    /// Aggregate facts.
    metadata: PlanMetadata,
    /// Topological order, `None` when the graph has a cycle.
    order: Option<Vec<String>>,
}

/// Draft a plan from a scan.
///
/// Only matches carrying a suggested fix become actions. `file` and `class`
/// fixes inside an import, require, config value, or path string become a
/// reference update plus a rename of the referenced file; those naming the
/// file they sit in also rename that file. Everything else is an in-place
/// replacement, one content change per file. Actions on a renamed file target
/// its new path and depend on the rename.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] when a match has a zero line or column,
/// empty text, or a range that does not cover its text.
pub fn create_plan(scan: &ScanResult) -> Result<RefactorPlan, Error> {
    check_scan(scan)?;

    let mut drafts = Drafts::default();
    for file in &scan.files {
        let mut edits = Vec::new();
        for m in &file.matches {
            let Some(suggested) = m.suggested.as_deref() else { continue };
            if m.category.implies_rename() && plan_rename(&mut drafts, scan, file, m, suggested)? {
                continue;
            }
            edits.push(m);
        }
        if !edits.is_empty() {
            drafts.content.push((file, edits));
        }
    }

    let mut plan = assemble(drafts, scan);
    let derived = derive(&plan);
    plan.execution_order = derived.order.unwrap_or_else(|| return declaration_order(&plan));
    plan.conflicts = derived.conflicts;
    plan.dependencies = derived.dependencies;
    plan.metadata = derived.metadata;

    tracing::info!(
        plan = %plan.id,
        renames = plan.renames.len(),
        content_changes = plan.content_changes.len(),
        reference_updates = plan.reference_updates.len(),
        conflicts = plan.conflicts.len(),
        "plan created"
    );
    return Ok(plan);
}

/// Judge a plan without changing it. Same plan, same result.
///
/// Errors: `invalid-input` (critical) for a malformed plan, `unknown-dependency`
/// for a `depends_on` id with no action, `duplicate-target` for renames sharing
/// a destination, `circular-dependency` for each dependency cycle. Conflicts and
/// high-risk actions nothing depends on are warnings.
pub fn validate_plan(plan: &RefactorPlan) -> ValidationResult {
    let actions = plan.actions();
    let graph = graph::analyze(&actions);

    let mut errors = structural_errors(plan, &actions);
    errors.extend(dependency_errors(plan, &actions));

    let duplicates = duplicate_targets(plan);
    for ids in &duplicates {
        let target = plan
            .renames
            .iter()
            .find(|r| return ids.first() == Some(&r.header.id))
            .map_or_else(String::new, |r| return r.new_path.display().to_string());
        errors.push(ValidationError {
            action_id: ids.first().cloned().unwrap_or_default(),
            code: ErrorCode::DuplicateTarget,
            message: format!("{} renames share the destination {target}", ids.len()),
            related_actions: ids.clone(),
            severity: IssueSeverity::Error,
        });
    }

    for cycle in &graph.cycles {
        let chain = cycle.iter().chain(cycle.first()).cloned().collect::<Vec<_>>().join(" -> ");
        errors.push(ValidationError {
            action_id: cycle.first().cloned().unwrap_or_default(),
            code: ErrorCode::CircularDependency,
            message: format!("circular dependency: {chain}"),
            related_actions: cycle.clone(),
            severity: IssueSeverity::Error,
        });
    }

    let found = conflicts::detect(&actions, &graph, &plan.existing_files);
    let warnings = warnings_for(&actions, &graph, &found, &duplicates);
    let suggestions = suggestions_for(&actions, &errors, &warnings);

    if !errors.is_empty() {
        tracing::warn!(plan = %plan.id, errors = errors.len(), "plan failed validation");
    }
    return ValidationResult { is_valid: errors.is_empty(), errors, suggestions, warnings };
}

/// Recompute execution order, conflicts, and metadata for a valid plan.
///
/// Connected actions are ordered with Kahn's algorithm (ready actions by
/// ascending priority, then id); actions with no edges follow in declaration
/// order.
///
/// # Errors
///
/// Returns [`Error::PlanRejected`] when [`validate_plan`] reports any error.
pub fn optimize_plan(plan: &RefactorPlan) -> Result<RefactorPlan, Error> {
    let verdict = validate_plan(plan);
    if let Some(first) = verdict.errors.first() {
        return Err(Error::PlanRejected { count: verdict.errors.len(), first: first.message.clone() });
    }

    let derived = derive(plan);
    let order = derived.order.ok_or_else(|| {
        return Error::PlanRejected { count: 1, first: "dependency graph has a cycle".to_string() };
    })?;

    let mut optimized = plan.clone();
    optimized.execution_order = order;
    optimized.conflicts = derived.conflicts;
    optimized.dependencies = derived.dependencies;
    optimized.metadata = derived.metadata;

    tracing::info!(plan = %optimized.id, actions = optimized.execution_order.len(), "plan optimized");
    return Ok(optimized);
}

/// Reject scan results no scanner could have produced.
fn check_scan(scan: &ScanResult) -> Result<(), Error> {
    for (file, m) in scan.iter_matches() {
        let at = format!("{}:{}:{}", file.path.display(), m.line, m.column);
        let reason = if m.line == 0 || m.column == 0 {
            Some(format!("{at}: match `{}` has a zero line or column", m.original))
        } else if m.original.is_empty() {
            Some(format!("{at}: match from `{}` is empty", m.pattern_id))
        } else if let Some(content) = &file.snapshot
            && content.get(m.byte_range()) != Some(m.original.as_str())
        {
            Some(format!("{at}: range {:?} does not cover `{}`", m.byte_range(), m.original))
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::warn!(%reason, "malformed scan result");
            return Err(Error::InvalidInput { reason });
        }
    }
    return Ok(());
}

/// Draft a rename for a `file`/`class` fix. Returns whether the match was
/// consumed as a reference, in which case it needs no in-place edit.
fn plan_rename<'s>(
    drafts: &mut Drafts<'s>,
    scan: &ScanResult,
    file: &'s FileMatch,
    m: &'s Match,
    suggested: &str,
) -> Result<bool, Error> {
    let (line, pos) = line_of(file, m)?;
    if let Some(site) = reference_site(file.file_type, &line, pos, m, suggested)
        && let Some((old_path, new_path)) = referenced_rename(&file.path, &site, &scan.inventory)
    {
        if drafts.reference_sites.insert((file.path.clone(), site.span.start)) {
            let rename = drafts.rename(old_path, new_path, Some(file.path.as_path()));
            drafts.references.push(ReferenceDraft { importer: file.path.clone(), line: m.line, rename, site });
        }
        return Ok(true);
    }

    if let Some(new_path) = stem_rename(&file.path, &m.original, suggested) {
        drafts.rename(file.path.clone(), new_path, None);
    }
    return Ok(false);
}

/// The full line holding `m` and the match's byte position within it.
/// Without a snapshot the trimmed context line stands in for the line.
fn line_of(file: &FileMatch, m: &Match) -> Result<(String, usize), Error> {
    if let Some(content) = file.snapshot.as_deref() {
        let index = LineIndex::new(content);
        let start = index.line_start(m.offset);
        return Ok((index.line_text(m.offset).to_string(), m.offset.saturating_sub(start)));
    }
    let end = m.context_offset.saturating_add(m.original.len());
    if m.context.get(m.context_offset..end) != Some(m.original.as_str()) {
        return Err(Error::InvalidInput {
            reason: format!("{}:{}: `{}` is not on its context line", file.path.display(), m.line, m.original),
        });
    }
    return Ok((m.context.clone(), m.context_offset));
}

/// Locate the reference string a match sits in, if the line is a reference.
fn reference_site(file_type: FileType, line: &str, pos: usize, m: &Match, suggested: &str) -> Option<ReferenceSite> {
    let end = pos.checked_add(m.original.len())?;
    let (start, stop, quoted) = match enclosing_literal(line, pos, end) {
        Some((start, stop)) => (start, stop, true),
        None if file_type == FileType::Config => {
            let (start, stop) = token_around(line, pos, end);
            (start, stop, false)
        },
        None => return None,
    };

    let literal = line.get(start..stop)?;
    let kind = if quoted && is_import_line(line.trim_start()) {
        ReferenceKind::Import
    } else if quoted && line.contains("require(") {
        ReferenceKind::Require
    } else if file_type == FileType::Config {
        ReferenceKind::Config
    } else if looks_like_path(literal) {
        ReferenceKind::Path
    } else {
        return None;
    };

    let head = line.get(start..pos)?;
    let tail = line.get(end..stop)?;
    let lead = u32::try_from(head.chars().count()).unwrap_or(u32::MAX);
    return Some(ReferenceSite {
        column: m.column.saturating_sub(lead).max(1),
        kind,
        literal: literal.to_string(),
        new_literal: format!("{head}{suggested}{tail}"),
        span: TextSpan::new(m.offset.checked_sub(head.len())?, literal.len()),
    });
}

/// Byte range of the quoted string enclosing `[start, end)`, quotes excluded.
fn enclosing_literal(line: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let before = line.get(..start)?;
    let (open, quote) = before.char_indices().rev().find(|&(_, c)| return matches!(c, '\'' | '"' | '`'))?;
    // An odd number of earlier quotes means `open` closes a string.
    if before.get(..open)?.matches(quote).count() % 2 != 0 {
        return None;
    }
    let close = line.get(end..)?.find(quote)?;
    return Some((open.saturating_add(1), end.saturating_add(close)));
}

/// Byte range of the unquoted token around `[start, end)`.
fn token_around(line: &str, start: usize, end: usize) -> (usize, usize) {
    let is_delim =
        |c: char| return c.is_whitespace() || matches!(c, ':' | '=' | ',' | ';' | '(' | ')' | '[' | ']' | '{' | '}');
    let from = line
        .get(..start)
        .and_then(|b| return b.char_indices().rev().find(|(_, c)| return is_delim(*c)))
        .map_or(0, |(i, c)| return i.saturating_add(c.len_utf8()));
    let to = line
        .get(end..)
        .and_then(|a| return a.find(is_delim))
        .map_or(line.len(), |i| return end.saturating_add(i));
    return (from, to);
}

fn is_import_line(trimmed: &str) -> bool {
    return trimmed.starts_with("import ")
        || trimmed.starts_with("import{")
        || trimmed.starts_with("import'")
        || trimmed.starts_with("import\"")
        || trimmed.starts_with("} from ")
        || (trimmed.starts_with("export ") && trimmed.contains(" from "))
        || trimmed.contains("import(");
}

fn looks_like_path(literal: &str) -> bool {
    return literal.starts_with("./") || literal.starts_with("../") || literal.contains('/');
}

/// Old and new path of the file a reference names, with the extension
/// recovered from the inventory when the specifier omits it. Bare specifiers
/// naming nothing in the project are packages, not files to rename.
fn referenced_rename(importer: &Path, site: &ReferenceSite, inventory: &[PathBuf]) -> Option<(PathBuf, PathBuf)> {
    let old = graph::resolve_reference(importer, &site.literal);
    let new = graph::resolve_reference(importer, &site.new_literal);
    if old == new {
        return None;
    }

    let Some(existing) = inventory.iter().find(|p| return graph::specifier_names(&old, p)) else {
        let relative = site.literal.starts_with("./") || site.literal.starts_with("../");
        return relative.then_some((old, new));
    };
    if *existing == old {
        return Some((old, new));
    }
    let new = match existing.extension() {
        Some(ext) => {
            let mut name = new.into_os_string();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        },
        None => new,
    };
    return Some((existing.clone(), new));
}

/// New path for a file whose stem is the matched name, in the stem's case style.
fn stem_rename(path: &Path, original: &str, suggested: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let key = loose(stem);
    if key.is_empty() || key != loose(original) {
        return None;
    }

    let mut name = restyle(suggested, stem);
    if let Some(ext) = path.extension().and_then(|e| return e.to_str()) {
        name.push('.');
        name.push_str(ext);
    }
    let new_path = path.with_file_name(name);
    return (new_path != path).then_some(new_path);
}

/// Lowercased alphanumerics only, so `user-service` and `UserService` agree.
fn loose(name: &str) -> String {
    return name.chars().filter(|c| return c.is_alphanumeric()).flat_map(char::to_lowercase).collect();
}

/// Convert `name` to the case style `like` is written in.
fn restyle(name: &str, like: &str) -> String {
    let has_lower = like.chars().any(char::is_lowercase);
    return if like.contains('-') {
        name.to_kebab_case()
    } else if like.contains('_') && !has_lower {
        name.to_shouty_snake_case()
    } else if like.contains('_') {
        name.to_snake_case()
    } else if like.starts_with(char::is_uppercase) {
        name.to_upper_camel_case()
    } else if like.chars().any(char::is_uppercase) {
        name.to_lower_camel_case()
    } else {
        name.to_string()
    };
}

fn path_label(path: &Path) -> String {
    return path.to_string_lossy().replace('\\', "/");
}

/// Turn drafts into actions and wrap them in a plan.
fn assemble(drafts: Drafts<'_>, scan: &ScanResult) -> RefactorPlan {
    let renames: Vec<FileRename> = drafts.renames.into_iter().map(build_rename).collect();
    let moved: HashMap<&Path, &FileRename> = renames.iter().map(|r| return (r.old_path.as_path(), r)).collect();
    let relocate = |path: &Path| -> (PathBuf, Vec<String>) {
        return moved
            .get(path)
            .map_or_else(|| (path.to_path_buf(), Vec::new()), |r| (r.new_path.clone(), vec![r.header.id.clone()]));
    };

    let content_changes: Vec<ContentChange> = drafts
        .content
        .into_iter()
        .map(|(file, matches)| {
            let (target, depends_on) = relocate(&file.path);
            return build_content_change(file, &matches, target, depends_on);
        })
        .collect();

    let reference_updates: Vec<ReferenceUpdate> = drafts
        .references
        .into_iter()
        .filter_map(|draft| {
            let rename = renames.get(draft.rename)?;
            let (file, mut depends_on) = relocate(&draft.importer);
            if !depends_on.contains(&rename.header.id) {
                depends_on.push(rename.header.id.clone());
            }
            return Some(build_reference_update(draft, file, depends_on));
        })
        .collect();

    let mut plan = RefactorPlan {
        conflicts: Vec::new(),
        content_changes,
        created_at: Utc::now(),
        dependencies: Vec::new(),
        execution_order: Vec::new(),
        existing_files: scan.inventory.clone(),
        id: String::new(),
        metadata: PlanMetadata::default(),
        reference_updates,
        renames,
    };
    plan.id = ids::plan_id(plan.actions().into_iter().map(RefactorAction::id));
    return plan;
}

fn build_rename(draft: RenameDraft) -> FileRename {
    let estimated_risk =
        if draft.referenced_by.len() >= RENAME_HIGH_REFERENCES { RiskLevel::High } else { RiskLevel::Medium };
    return FileRename {
        header: ActionHeader {
            depends_on: Vec::new(),
            estimated_risk,
            id: ids::action_id(ActionKind::FileRename, &draft.old_path, ""),
            priority: ActionKind::FileRename.default_priority(),
            rollback: RollbackData::RenameBack { from: draft.new_path.clone(), to: draft.old_path.clone() },
            source: path_label(&draft.old_path),
            target: path_label(&draft.new_path),
        },
        update_references: !draft.referenced_by.is_empty(),
        new_path: draft.new_path,
        old_path: draft.old_path,
        referenced_by: draft.referenced_by,
    };
}

fn build_content_change(file: &FileMatch, matches: &[&Match], target: PathBuf, depends_on: Vec<String>) -> ContentChange {
    let mut replacements: Vec<TextReplacement> = Vec::with_capacity(matches.len());
    for m in matches {
        let Some(replacement) = m.suggested.clone() else { continue };
        let edit = TextReplacement {
            category: m.category,
            column: m.column,
            context: m.context.clone(),
            length: m.original.len(),
            line: m.line,
            offset: m.offset,
            original: m.original.clone(),
            replacement,
        };
        if replacements.iter().any(|r| return r.span().overlaps(&edit.span())) {
            tracing::debug!(path = %file.path.display(), line = m.line, pattern = %m.pattern_id, "dropping overlapping fix");
            continue;
        }
        replacements.push(edit);
    }

    let estimated_risk = if replacements.iter().any(|r| return matches!(r.category, Category::Api | Category::Database)) {
        RiskLevel::High
    } else if replacements.len() > CONTENT_MEDIUM_REPLACEMENTS {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    return ContentChange {
        header: ActionHeader {
            depends_on,
            estimated_risk,
            id: ids::action_id(ActionKind::ContentChange, &file.path, ""),
            priority: ActionKind::ContentChange.default_priority(),
            rollback: RollbackData::RestoreContent { backup: file.snapshot.clone(), file: target.clone() },
            source: path_label(&file.path),
            target: path_label(&target),
        },
        file: target,
        replacements,
    };
}

fn build_reference_update(draft: ReferenceDraft, file: PathBuf, depends_on: Vec<String>) -> ReferenceUpdate {
    let site = draft.site;
    return ReferenceUpdate {
        column: site.column,
        header: ActionHeader {
            depends_on,
            estimated_risk: RiskLevel::Low,
            id: ids::action_id(ActionKind::ReferenceUpdate, &draft.importer, &site.span.start.to_string()),
            priority: ActionKind::ReferenceUpdate.default_priority(),
            rollback: RollbackData::RestoreReference {
                file: file.clone(),
                reference: site.literal.clone(),
                span: TextSpan::new(site.span.start, site.new_literal.len()),
            },
            source: path_label(&draft.importer),
            target: site.new_literal.clone(),
        },
        file,
        kind: site.kind,
        line: draft.line,
        new_reference: site.new_literal,
        old_reference: site.literal,
        span: site.span,
    };
}

/// Everything the dependency graph determines about a plan.
fn derive(plan: &RefactorPlan) -> Derived {
    let actions = plan.actions();
    let graph = graph::analyze(&actions);

    let order = graph.topological_order().map(|mut order| {
        let connected = graph.connected_ids();
        order.extend(
            actions
                .iter()
                .map(|a| return a.id())
                .filter(|id| return !connected.contains(id))
                .map(str::to_string),
        );
        return order;
    });

    return Derived {
        conflicts: conflicts::detect(&actions, &graph, &plan.existing_files),
        dependencies: dependency_records(&actions, &graph),
        metadata: metadata_for(&actions),
        order,
    };
}

fn declaration_order(plan: &RefactorPlan) -> Vec<String> {
    return plan.actions().into_iter().map(|a| return a.id().to_string()).collect();
}

/// One record per (action, reason), prerequisites in edge order.
fn dependency_records(actions: &[RefactorAction<'_>], graph: &DependencyGraph) -> Vec<PlanDependency> {
    let mut records = Vec::new();
    for action in actions {
        let mut by_kind: BTreeMap<DependencyKind, Vec<String>> = BTreeMap::new();
        for edge in graph.edges.iter().filter(|e| return e.to == action.id()) {
            by_kind.entry(edge.kind).or_default().push(edge.from.clone());
        }
        records.extend(by_kind.into_iter().map(|(kind, depends_on)| {
            return PlanDependency { action_id: action.id().to_string(), depends_on, kind };
        }));
    }
    return records;
}

fn metadata_for(actions: &[RefactorAction<'_>]) -> PlanMetadata {
    let risky = actions.iter().any(|a| return a.header().estimated_risk != RiskLevel::Low);
    return PlanMetadata {
        backup_required: risky,
        estimated_duration_minutes: actions
            .iter()
            .fold(0_u32, |total, a| return total.saturating_add(a.kind().cost_minutes())),
        risk_level: actions.iter().map(|a| return a.header().estimated_risk).max().unwrap_or_default(),
        testing_required: risky,
        total_actions: actions.len(),
    };
}

/// Malformed plans: empty or repeated ids, zero positions, an execution
/// order that is not a permutation of the actions.
fn structural_errors(plan: &RefactorPlan, actions: &[RefactorAction<'_>]) -> Vec<ValidationError> {
    let critical = |action_id: &str, message: String| {
        return ValidationError {
            action_id: action_id.to_string(),
            code: ErrorCode::InvalidInput,
            message,
            related_actions: if action_id.is_empty() { Vec::new() } else { vec![action_id.to_string()] },
            severity: IssueSeverity::Critical,
        };
    };

    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for action in actions {
        let id = action.id();
        if id.is_empty() {
            let path = action.primary_path().display();
            errors.push(critical(id, format!("{} action on {path} has an empty id", action.kind().id_prefix())));
        } else if !seen.insert(id) {
            errors.push(critical(id, format!("action id {id} is used more than once")));
        }

        let zero_position = match action {
            RefactorAction::Content(change) => change.replacements.iter().any(|r| return r.line == 0 || r.column == 0),
            RefactorAction::Reference(update) => update.line == 0 || update.column == 0,
            RefactorAction::Rename(_) => false,
        };
        if zero_position {
            errors.push(critical(id, format!("{id} has a zero line or column")));
        }
    }

    if !plan.execution_order.is_empty() {
        let ordered: BTreeSet<&str> = plan.execution_order.iter().map(String::as_str).collect();
        let declared: BTreeSet<&str> = actions.iter().map(|a| return a.id()).collect();
        if ordered != declared || ordered.len() != plan.execution_order.len() {
            errors.push(critical("", "execution order is not a permutation of the plan's actions".to_string()));
        }
    }
    return errors;
}

/// Every `depends_on` id, on actions and dependency records, must name an action.
fn dependency_errors(plan: &RefactorPlan, actions: &[RefactorAction<'_>]) -> Vec<ValidationError> {
    let known: HashSet<&str> = actions.iter().map(|a| return a.id()).collect();
    let declared = actions.iter().map(|a| return (a.id(), &a.header().depends_on));
    let recorded = plan.dependencies.iter().map(|d| return (d.action_id.as_str(), &d.depends_on));

    let mut reported = BTreeSet::new();
    let mut errors = Vec::new();
    for (action_id, depends_on) in declared.chain(recorded) {
        for dep in depends_on.iter().filter(|d| return !known.contains(d.as_str())) {
            if !reported.insert((action_id, dep.as_str())) {
                continue;
            }
            errors.push(ValidationError {
                action_id: action_id.to_string(),
                code: ErrorCode::UnknownDependency,
                message: format!("{action_id} depends on {dep}, which is not in the plan"),
                related_actions: vec![action_id.to_string()],
                severity: IssueSeverity::Error,
            });
        }
    }
    return errors;
}

/// Sorted id groups of renames sharing a destination.
fn duplicate_targets(plan: &RefactorPlan) -> BTreeSet<Vec<String>> {
    let mut by_target: BTreeMap<&Path, Vec<String>> = BTreeMap::new();
    for rename in &plan.renames {
        by_target.entry(rename.new_path.as_path()).or_default().push(rename.header.id.clone());
    }
    return by_target
        .into_values()
        .filter(|ids| return ids.len() > 1)
        .map(|mut ids| {
            ids.sort();
            ids.dedup();
            return ids;
        })
        .collect();
}

fn warnings_for(
    actions: &[RefactorAction<'_>],
    graph: &DependencyGraph,
    found: &[ConflictInfo],
    duplicates: &BTreeSet<Vec<String>>,
) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    for conflict in found {
        // Cycles and duplicate targets are already errors.
        if conflict.conflict_type == ConflictType::DependencyConflict || duplicates.contains(&conflict.action_ids) {
            continue;
        }
        warnings.push(ValidationWarning {
            action_id: conflict.action_ids.first().cloned().unwrap_or_default(),
            message: format!(
                "{} ({}): {}",
                conflict.conflict_type.label(),
                conflict.severity.label(),
                conflict.description
            ),
            suggestion: conflict.resolution.clone(),
        });
    }

    let successors = graph.successors();
    for action in actions {
        let header = action.header();
        if header.estimated_risk == RiskLevel::High && successors.get(action.id()).is_none_or(Vec::is_empty) {
            warnings.push(ValidationWarning {
                action_id: header.id.clone(),
                message: format!("{} is high risk and nothing depends on it", header.id),
                suggestion: format!("review {} by hand before applying", header.target),
            });
        }
    }
    return warnings;
}

fn suggestions_for(
    actions: &[RefactorAction<'_>],
    errors: &[ValidationError],
    warnings: &[ValidationWarning],
) -> Vec<String> {
    let mut suggestions = Vec::new();
    if actions.is_empty() {
        suggestions.push("nothing to apply: no match carries a fix".to_string());
    }
    if errors.iter().any(|e| return e.code == ErrorCode::CircularDependency) {
        suggestions.push("drop or split one action in each dependency cycle".to_string());
    }
    if errors.iter().any(|e| return e.severity == IssueSeverity::Critical) {
        suggestions.push("regenerate the plan from a fresh scan".to_string());
    }
    if !warnings.is_empty() {
        suggestions.push("review the warnings before handing the plan to an executor".to_string());
    }
    if actions.iter().any(|a| return a.header().estimated_risk != RiskLevel::Low) {
        suggestions.push("back up the project and run its tests after applying".to_string());
    }
    return suggestions;
}
