//! Structural conflict detection between refactor actions.
//!
//! Each conflict class is checked independently, so one pair of actions can
//! surface more than one conflict. Conflicts annotate a plan; they never
//! remove actions from it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::actions::{RefactorAction, TextSpan};
use crate::graph::{self, DependencyGraph};
use crate::types::Severity;

/// Conflict class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    /// Overlapping or adjacent in-place edits.
    ContentConflict,
    /// Actions that depend on each other in a loop.
    DependencyConflict,
    /// Renames colliding on a destination, or edits to a path being moved away.
    FileConflict,
    /// Overlapping or stale reference updates.
    ReferenceConflict,
}

impl ConflictType {
    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::ContentConflict => "content-conflict",
            Self::DependencyConflict => "dependency-conflict",
            Self::FileConflict => "file-conflict",
            Self::ReferenceConflict => "reference-conflict",
        };
    }
}

/// A detected incompatibility between actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    /// Affected action ids, sorted.
    pub action_ids: Vec<String>,
    /// What collides.
    pub description: String,
    /// How a human could resolve it.
    pub resolution: String,
    /// Blast radius.
    pub severity: Severity,
    /// Conflict class.
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
}

impl ConflictInfo {
    fn new(
        conflict_type: ConflictType,
        mut action_ids: Vec<String>,
        severity: Severity,
        description: String,
        resolution: &str,
    ) -> Self {
        action_ids.sort();
        action_ids.dedup();
        return Self { action_ids, description, resolution: resolution.to_string(), severity, conflict_type };
    }
}

/// One edited byte range, tagged with its owner.
struct Edit<'a> {
    id: &'a str,
    is_reference: bool,
    line: u32,
    span: TextSpan,
}

/// Detect every conflict among `actions`.
///
/// `existing` lists files present before any action runs; a rename onto one
/// of them that nothing else moves away is a conflict.
pub fn detect(actions: &[RefactorAction<'_>], graph: &DependencyGraph, existing: &[PathBuf]) -> Vec<ConflictInfo> {
    let mut conflicts = Vec::new();
    detect_file_conflicts(actions, existing, &mut conflicts);
    detect_edit_conflicts(actions, &mut conflicts);
    detect_stale_references(actions, &mut conflicts);

    for cycle in &graph.cycles {
        conflicts.push(ConflictInfo::new(
            ConflictType::DependencyConflict,
            cycle.clone(),
            Severity::High,
            format!("circular dependency: {} -> {}", cycle.join(" -> "), cycle.first().map_or("", String::as_str)),
            "break the loop by dropping or splitting one of the listed actions",
        ));
    }

    conflicts.sort_by(|a, b| (a.conflict_type, &a.action_ids, &a.description).cmp(&(b.conflict_type, &b.action_ids, &b.description)));
    conflicts.dedup();
    return conflicts;
}

/// Severity for a conflict involving `n` actions.
const fn blast_radius(n: usize) -> Severity {
    return if n >= 3 { Severity::High } else { Severity::Medium };
}

fn detect_file_conflicts(actions: &[RefactorAction<'_>], existing: &[PathBuf], out: &mut Vec<ConflictInfo>) {
    let renames: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            RefactorAction::Rename(r) => Some(*r),
            _ => None,
        })
        .collect();

    let mut by_target: BTreeMap<&Path, Vec<String>> = BTreeMap::new();
    for rename in &renames {
        by_target.entry(rename.new_path.as_path()).or_default().push(rename.header.id.clone());
    }
    for (target, ids) in by_target.into_iter().filter(|(_, ids)| ids.len() > 1) {
        out.push(ConflictInfo::new(
            ConflictType::FileConflict,
            ids.clone(),
            blast_radius(ids.len()),
            format!("{} renames target {}", ids.len(), target.display()),
            "choose distinct destination names",
        ));
    }

    let moved_away: BTreeSet<&Path> = renames.iter().map(|r| r.old_path.as_path()).collect();
    for rename in &renames {
        let target = rename.new_path.as_path();
        if existing.iter().any(|p| p == target) && !moved_away.contains(target) {
            out.push(ConflictInfo::new(
                ConflictType::FileConflict,
                vec![rename.header.id.clone()],
                Severity::Medium,
                format!("rename would overwrite existing file {}", target.display()),
                "rename or remove the existing file first, or pick another name",
            ));
        }
    }

    for action in actions {
        let file = match action {
            RefactorAction::Rename(_) => continue,
            RefactorAction::Content(c) => c.file.as_path(),
            RefactorAction::Reference(r) => r.file.as_path(),
        };
        for rename in renames.iter().filter(|r| r.old_path == file) {
            out.push(ConflictInfo::new(
                ConflictType::FileConflict,
                vec![rename.header.id.clone(), action.id().to_string()],
                Severity::Medium,
                format!("{} edits {} which a pending rename moves away", action.id(), file.display()),
                "retarget the edit at the post-rename path",
            ));
        }
    }
}

/// Overlapping edits on one file are grouped into connected components; a
/// component of two or more actions is one conflict. Edits by different
/// actions on the same or adjacent lines are a low-severity advisory.
fn detect_edit_conflicts(actions: &[RefactorAction<'_>], out: &mut Vec<ConflictInfo>) {
    let mut by_file: BTreeMap<&Path, Vec<Edit<'_>>> = BTreeMap::new();
    for action in actions {
        match action {
            RefactorAction::Rename(_) => {},
            RefactorAction::Content(change) => {
                let edits = by_file.entry(change.file.as_path()).or_default();
                edits.extend(change.replacements.iter().map(|r| Edit {
                    id: change.header.id.as_str(),
                    is_reference: false,
                    line: r.line,
                    span: r.span(),
                }));
            },
            RefactorAction::Reference(update) => {
                by_file.entry(update.file.as_path()).or_default().push(Edit {
                    id: update.header.id.as_str(),
                    is_reference: true,
                    line: update.line,
                    span: update.span,
                });
            },
        }
    }

    for (file, edits) in &by_file {
        let mut components = UnionFind::default();
        let mut near: BTreeSet<(&str, &str)> = BTreeSet::new();

        for (i, a) in edits.iter().enumerate() {
            components.touch(a.id);
            for b in edits.iter().skip(i.saturating_add(1)).filter(|b| b.id != a.id) {
                if a.span.overlaps(&b.span) {
                    components.union(a.id, b.id);
                } else if a.line.abs_diff(b.line) <= 1 {
                    near.insert(if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) });
                }
            }
        }

        let groups = components.groups();
        for ids in groups.values().filter(|ids| ids.len() > 1) {
            let all_references = ids.iter().all(|id| edits.iter().any(|e| e.id == *id && e.is_reference));
            let conflict_type =
                if all_references { ConflictType::ReferenceConflict } else { ConflictType::ContentConflict };
            out.push(ConflictInfo::new(
                conflict_type,
                ids.iter().map(|s| s.to_string()).collect(),
                blast_radius(ids.len()),
                format!("{} actions edit overlapping text in {}", ids.len(), file.display()),
                "merge the overlapping edits into one action or drop all but one",
            ));
        }

        for (a, b) in near {
            if components.find(a) == components.find(b) {
                continue;
            }
            out.push(ConflictInfo::new(
                ConflictType::ContentConflict,
                vec![a.to_string(), b.to_string()],
                Severity::Low,
                format!("{a} and {b} edit adjacent lines in {}", file.display()),
                "review the combined result; no ordering is required",
            ));
        }
    }
}

fn detect_stale_references(actions: &[RefactorAction<'_>], out: &mut Vec<ConflictInfo>) {
    let renamed: Vec<&Path> = actions
        .iter()
        .filter_map(|a| match a {
            RefactorAction::Rename(r) => Some(r.old_path.as_path()),
            _ => None,
        })
        .collect();

    for action in actions {
        let RefactorAction::Reference(update) = action else { continue };
        let resolved = graph::resolve_reference(Path::new(&update.header.source), &update.old_reference);
        if renamed.iter().any(|old| graph::specifier_names(&resolved, old)) {
            continue;
        }
        out.push(ConflictInfo::new(
            ConflictType::ReferenceConflict,
            vec![update.header.id.clone()],
            Severity::Medium,
            format!("`{}` in {} matches no planned rename", update.old_reference, update.file.display()),
            "restore the rename this reference depended on, or drop the update",
        ));
    }
}

/// Minimal union-find over borrowed ids.
#[derive(Default)]
struct UnionFind<'a> {
    parent: BTreeMap<&'a str, &'a str>,
}

impl<'a> UnionFind<'a> {
    fn touch(&mut self, id: &'a str) {
        self.parent.entry(id).or_insert(id);
    }

    fn find(&self, id: &'a str) -> &'a str {
        let mut current = id;
        while let Some(&next) = self.parent.get(current) {
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    fn union(&mut self, a: &'a str, b: &'a str) {
        self.touch(a);
        self.touch(b);
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            let (root, child) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent.insert(child, root);
        }
    }

    fn groups(&self) -> BTreeMap<&'a str, Vec<&'a str>> {
        let mut groups: BTreeMap<&'a str, Vec<&'a str>> = BTreeMap::new();
        for id in self.parent.keys().copied() {
            groups.entry(self.find(id)).or_default().push(id);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{
        ActionHeader, ContentChange, FileRename, ReferenceKind, ReferenceUpdate, RiskLevel, RollbackData,
        TextReplacement,
    };
    use crate::types::Category;

    fn header(id: &str, source: &str) -> ActionHeader {
        ActionHeader {
            depends_on: Vec::new(),
            estimated_risk: RiskLevel::Low,
            id: id.to_string(),
            priority: 20,
            rollback: RollbackData::RestoreContent { backup: None, file: PathBuf::new() },
            source: source.to_string(),
            target: String::new(),
        }
    }

    fn replacement(offset: usize, length: usize, line: u32) -> TextReplacement {
        TextReplacement {
            category: Category::Variable,
            column: 1,
            context: String::new(),
            length,
            line,
            offset,
            original: "x".repeat(length),
            replacement: "y".to_string(),
        }
    }

    fn change(id: &str, file: &str, reps: Vec<TextReplacement>) -> ContentChange {
        ContentChange { file: PathBuf::from(file), header: header(id, file), replacements: reps }
    }

    fn rename(id: &str, old: &str, new: &str) -> FileRename {
        FileRename {
            header: header(id, old),
            new_path: PathBuf::from(new),
            old_path: PathBuf::from(old),
            referenced_by: Vec::new(),
            update_references: true,
        }
    }

    fn detect_all(actions: &[RefactorAction<'_>]) -> Vec<ConflictInfo> {
        let graph = graph::analyze(actions);
        detect(actions, &graph, &[])
    }

    #[test]
    fn overlapping_content_changes_conflict_once_in_either_order() {
        let a = change("a", "app.ts", vec![replacement(10, 10, 1)]);
        let b = change("b", "app.ts", vec![replacement(15, 10, 1)]);

        let forward = detect_all(&[RefactorAction::Content(&a), RefactorAction::Content(&b)]);
        let backward = detect_all(&[RefactorAction::Content(&b), RefactorAction::Content(&a)]);

        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].conflict_type, ConflictType::ContentConflict);
        assert_eq!(forward[0].action_ids, vec!["a", "b"]);
        assert_eq!(forward[0].severity, Severity::Medium);
    }

    #[test]
    fn three_way_overlap_is_high() {
        let a = change("a", "app.ts", vec![replacement(0, 10, 1)]);
        let b = change("b", "app.ts", vec![replacement(5, 10, 1)]);
        let c = change("c", "app.ts", vec![replacement(12, 10, 1)]);
        let conflicts =
            detect_all(&[RefactorAction::Content(&a), RefactorAction::Content(&b), RefactorAction::Content(&c)]);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::High);
    }

    #[test]
    fn adjacent_lines_are_low_advisory() {
        let a = change("a", "app.ts", vec![replacement(0, 5, 1)]);
        let b = change("b", "app.ts", vec![replacement(20, 5, 2)]);
        let conflicts = detect_all(&[RefactorAction::Content(&a), RefactorAction::Content(&b)]);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Low);
    }

    #[test]
    fn duplicate_rename_targets_conflict() {
        let a = rename("a", "one.ts", "same.ts");
        let b = rename("b", "two.ts", "same.ts");
        let conflicts = detect_all(&[RefactorAction::Rename(&a), RefactorAction::Rename(&b)]);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::FileConflict);
    }

    #[test]
    fn rename_onto_existing_file_conflicts_unless_it_moves() {
        let a = rename("a", "old.ts", "taken.ts");
        let actions = [RefactorAction::Rename(&a)];
        let graph = graph::analyze(&actions);
        assert_eq!(detect(&actions, &graph, &[PathBuf::from("taken.ts")]).len(), 1);

        let b = rename("b", "taken.ts", "elsewhere.ts");
        let actions = [RefactorAction::Rename(&a), RefactorAction::Rename(&b)];
        let graph = graph::analyze(&actions);
        assert!(detect(&actions, &graph, &[PathBuf::from("taken.ts")]).is_empty());
    }

    #[test]
    fn reference_without_rename_is_stale() {
        let update = ReferenceUpdate {
            column: 20,
            file: PathBuf::from("src/app.ts"),
            header: header("r", "src/app.ts"),
            kind: ReferenceKind::Import,
            line: 1,
            new_reference: "./new-module".to_string(),
            old_reference: "./old-module".to_string(),
            span: TextSpan::new(19, 12),
        };
        let conflicts = detect_all(&[RefactorAction::Reference(&update)]);

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].conflict_type, ConflictType::ReferenceConflict);
        assert_eq!(conflicts[0].action_ids, vec!["r"]);
    }

    fn reference(id: &str, start: usize, len: usize) -> ReferenceUpdate {
        ReferenceUpdate {
            column: u32::try_from(start + 1).unwrap(),
            file: PathBuf::from("src/app.ts"),
            header: header(id, "src/app.ts"),
            kind: ReferenceKind::Import,
            line: 1,
            new_reference: "./new-module".to_string(),
            old_reference: "./old-module".to_string(),
            span: TextSpan::new(start, len),
        }
    }

    #[test]
    fn overlapping_reference_updates_are_a_reference_conflict() {
        let first = reference("r1", 10, 10);
        let second = reference("r2", 15, 10);
        let conflicts = detect_all(&[RefactorAction::Reference(&first), RefactorAction::Reference(&second)]);

        let overlap: Vec<&ConflictInfo> = conflicts.iter().filter(|c| c.action_ids.len() == 2).collect();
        assert_eq!(overlap.len(), 1, "{conflicts:?}");
        assert_eq!(overlap[0].conflict_type, ConflictType::ReferenceConflict);
        assert_eq!(overlap[0].action_ids, vec!["r1", "r2"]);
    }

    #[test]
    fn editing_a_file_that_is_renamed_away_is_a_file_conflict() {
        let moved = rename("m", "src/old.ts", "src/new.ts");
        let edit = change("e", "src/old.ts", vec![replacement(0, 5, 1)]);
        let conflicts = detect_all(&[RefactorAction::Rename(&moved), RefactorAction::Content(&edit)]);

        assert_eq!(conflicts.len(), 1, "{conflicts:?}");
        assert_eq!(conflicts[0].conflict_type, ConflictType::FileConflict);
        assert_eq!(conflicts[0].action_ids, vec!["e", "m"]);
        assert_eq!(conflicts[0].severity, Severity::Medium);
    }
}
