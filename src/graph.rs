//! Dependency analysis over refactor actions.
//!
//! Nodes are actions, each annotated with the files it touches; a file index
//! maps every touched file back to its actions. Edges run from prerequisite
//! to dependent and are typed by why the ordering exists. Analysis never
//! fails: cycles are recorded on the graph for the planner to judge.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::actions::{ActionKind, RefactorAction};
use crate::files::normalize_path;

/// Why one action must precede another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DependencyKind {
    /// The dependent edits a file the prerequisite moves.
    FileDependency,
    /// Sequencing without a file or reference relationship.
    OrderDependency,
    /// The dependent rewrites a reference to a file the prerequisite moves.
    ReferenceDependency,
}

impl DependencyKind {
    /// Stable kebab-case label used in output.
    pub const fn label(self) -> &'static str {
        match self {
            Self::FileDependency => "file-dependency",
            Self::OrderDependency => "order-dependency",
            Self::ReferenceDependency => "reference-dependency",
        }
    }
}

/// One action in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Files the action reads or writes.
    pub files: Vec<PathBuf>,
    /// Action id.
    pub id: String,
    /// Action kind.
    pub kind: ActionKind,
    /// Scheduling priority copied from the action.
    pub priority: u32,
}

/// `from` must be applied before `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Prerequisite action id.
    pub from: String,
    /// Reason recorded first for this pair.
    pub kind: DependencyKind,
    /// Dependent action id.
    pub to: String,
    /// Number of independent reasons found for this pair.
    pub weight: u32,
}

/// Per-pass dependency graph. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    /// Every cycle found, each starting at the first revisited node.
    pub cycles: Vec<Vec<String>>,
    /// Edges in discovery order.
    pub edges: Vec<GraphEdge>,
    /// File → ids of actions touching it.
    pub files: BTreeMap<PathBuf, Vec<String>>,
    /// Nodes in action declaration order.
    pub nodes: Vec<GraphNode>,
}

impl DependencyGraph {
    /// Successor ids per node, in edge order.
    pub fn successors(&self) -> HashMap<&str, Vec<&str>> {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &self.edges {
            adjacency.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
        }
        adjacency
    }

    /// Ids with at least one edge in either direction.
    pub fn connected_ids(&self) -> BTreeSet<&str> {
        self.edges.iter().flat_map(|e| [e.from.as_str(), e.to.as_str()]).collect()
    }

    /// Order the connected part of the graph with Kahn's algorithm.
    ///
    /// Zero-indegree nodes are released in ascending `(priority, id)` order.
    /// Returns `None` if a cycle keeps some node from ever being released.
    pub fn topological_order(&self) -> Option<Vec<String>> {
        let connected = self.connected_ids();
        let priorities: HashMap<&str, u32> =
            self.nodes.iter().map(|n| (n.id.as_str(), n.priority)).collect();
        let successors = self.successors();

        let mut indegree: HashMap<&str, usize> = connected.iter().map(|id| (*id, 0)).collect();
        for edge in &self.edges {
            if let Some(d) = indegree.get_mut(edge.to.as_str()) {
                *d = d.saturating_add(1);
            }
        }

        let priority_of = |id: &str| priorities.get(id).copied().unwrap_or(u32::MAX);
        let mut ready: BTreeSet<(u32, &str)> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| (priority_of(id), *id))
            .collect();

        let mut order = Vec::with_capacity(connected.len());
        while let Some((_, id)) = ready.pop_first() {
            order.push(id.to_string());
            for next in successors.get(id).map(Vec::as_slice).unwrap_or_default() {
                let Some(d) = indegree.get_mut(next) else { continue };
                *d = d.saturating_sub(1);
                if *d == 0 {
                    ready.insert((priority_of(next), *next));
                }
            }
        }

        (order.len() == connected.len()).then_some(order)
    }
}

/// Build the dependency graph for a set of actions.
///
/// Besides every declared `depends_on` id, edges are inferred from renames:
/// an edit inside a renamed file (file dependency), a reference resolving to
/// a renamed file's old or new path (reference dependency), a content edit
/// mentioning the renamed file's name, and a rename whose source is another
/// rename's destination (order dependencies).
pub fn analyze<'a>(actions: &[RefactorAction<'a>]) -> DependencyGraph {
    let mut builder = EdgeBuilder::default();
    let known: HashSet<&str> = actions.iter().map(|a| a.id()).collect();

    for rename in actions.iter().filter_map(|a| match a {
        RefactorAction::Rename(r) => Some(*r),
        _ => None,
    }) {
        for other in actions {
            if other.id() == rename.header.id.as_str() {
                continue;
            }
            if let Some(kind) = inferred_dependency(rename, *other) {
                builder.add(&rename.header.id, other.id(), kind);
            }
            if let RefactorAction::Rename(next) = other
                && next.old_path == rename.new_path
            {
                // `next` vacates the path `rename` moves into.
                builder.add(&next.header.id, &rename.header.id, DependencyKind::OrderDependency);
            }
        }
    }

    for action in actions {
        for dep in &action.header().depends_on {
            if !known.contains(dep.as_str()) {
                continue;
            }
            let kind = actions
                .iter()
                .find(|a| a.id() == dep.as_str())
                .and_then(|prereq| match prereq {
                    RefactorAction::Rename(r) => inferred_dependency(r, *action),
                    _ => None,
                })
                .unwrap_or(DependencyKind::OrderDependency);
            builder.add(dep, action.id(), kind);
        }
    }

    let mut graph = DependencyGraph {
        cycles: Vec::new(),
        edges: builder.edges,
        files: BTreeMap::new(),
        nodes: actions
            .iter()
            .map(|a| GraphNode {
                files: a.touched_files().into_iter().map(Path::to_path_buf).collect(),
                id: a.id().to_string(),
                kind: a.kind(),
                priority: a.header().priority,
            })
            .collect(),
    };
    for node in &graph.nodes {
        for file in &node.files {
            graph.files.entry(file.clone()).or_default().push(node.id.clone());
        }
    }
    graph.cycles = detect_cycles(&graph);

    tracing::debug!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        cycles = graph.cycles.len(),
        "dependency graph built"
    );
    graph
}

/// Find every cycle with a white/gray/black depth-first traversal.
///
/// A back-edge to a gray node closes a cycle, reported as the node sequence
/// from that node to the current one. Rotations of a cycle already reported
/// are not repeated.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let successors = graph.successors();
    let mut color: HashMap<&str, Color> =
        graph.nodes.iter().map(|n| (n.id.as_str(), Color::White)).collect();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut cycles = Vec::new();

    for start in graph.nodes.iter().map(|n| n.id.as_str()) {
        if color.get(start) != Some(&Color::White) {
            continue;
        }
        color.insert(start, Color::Gray);
        let mut stack: Vec<(&str, usize)> = vec![(start, 0)];

        while let Some(&(node, child)) = stack.last() {
            let next = successors.get(node).and_then(|s| s.get(child)).copied();
            let Some(next) = next else {
                color.insert(node, Color::Black);
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 = child.saturating_add(1);
            }

            match color.get(next).copied().unwrap_or(Color::Black) {
                Color::White => {
                    color.insert(next, Color::Gray);
                    stack.push((next, 0));
                },
                Color::Gray => {
                    let from = stack.iter().position(|(id, _)| *id == next).unwrap_or(0);
                    let cycle: Vec<String> = stack.iter().skip(from).map(|(id, _)| id.to_string()).collect();
                    if seen.insert(canonical_rotation(&cycle)) {
                        tracing::warn!(chain = %cycle.join(" -> "), "dependency cycle");
                        cycles.push(cycle);
                    }
                },
                Color::Black => {},
            }
        }
    }
    cycles
}

/// Resolve a reference string the way a module loader would, lexically:
/// relative specifiers against the importer's directory, others as given.
pub fn resolve_reference(importer: &Path, reference: &str) -> PathBuf {
    if reference.starts_with("./") || reference.starts_with("../") {
        let dir = importer.parent().unwrap_or(Path::new(""));
        return normalize_path(&dir.join(reference));
    }
    normalize_path(Path::new(reference))
}

/// Whether a resolved specifier names `file`, with or without its extension.
pub fn specifier_names(resolved: &Path, file: &Path) -> bool {
    resolved == file || (file.extension().is_some() && resolved == file.with_extension(""))
}

/// Why `dependent` must follow `rename`, if it must.
fn inferred_dependency(
    rename: &crate::actions::FileRename,
    dependent: RefactorAction<'_>,
) -> Option<DependencyKind> {
    let in_renamed_file = |file: &Path| file == rename.old_path || file == rename.new_path;

    match dependent {
        RefactorAction::Rename(_) => None,
        RefactorAction::Content(change) => {
            if in_renamed_file(change.file.as_path()) {
                return Some(DependencyKind::FileDependency);
            }
            let name = rename.old_path.file_name()?.to_string_lossy();
            change
                .replacements
                .iter()
                .any(|r| r.context.contains(&*name))
                .then_some(DependencyKind::OrderDependency)
        },
        RefactorAction::Reference(update) => {
            let importer = Path::new(&update.header.source);
            let names_rename = |reference: &str| {
                let resolved = resolve_reference(importer, reference);
                specifier_names(&resolved, &rename.old_path) || specifier_names(&resolved, &rename.new_path)
            };
            if names_rename(&update.old_reference) || names_rename(&update.new_reference) {
                return Some(DependencyKind::ReferenceDependency);
            }
            in_renamed_file(update.file.as_path()).then_some(DependencyKind::FileDependency)
        },
    }
}

/// Deduplicating edge accumulator; repeated pairs raise the weight.
#[derive(Default)]
struct EdgeBuilder {
    edges: Vec<GraphEdge>,
    index: HashMap<(String, String), usize>,
}

impl EdgeBuilder {
    fn add(&mut self, from: &str, to: &str, kind: DependencyKind) {
        let key = (from.to_string(), to.to_string());
        if let Some(edge) = self.index.get(&key).and_then(|i| self.edges.get_mut(*i)) {
            edge.weight = edge.weight.saturating_add(1);
            return;
        }
        tracing::debug!(from, to, kind = kind.label(), "dependency edge");
        self.index.insert(key, self.edges.len());
        self.edges.push(GraphEdge { from: from.to_string(), kind, to: to.to_string(), weight: 1 });
    }
}

/// Rotate so the smallest id comes first; equal cycles compare equal.
fn canonical_rotation(cycle: &[String]) -> Vec<String> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map_or(0, |(i, _)| i);
    cycle.iter().skip(pivot).chain(cycle.iter().take(pivot)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionHeader, ContentChange, FileRename, RiskLevel, RollbackData};

    fn header(id: &str, depends_on: &[&str], priority: u32) -> ActionHeader {
        ActionHeader {
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            estimated_risk: RiskLevel::Low,
            id: id.to_string(),
            priority,
            rollback: RollbackData::RestoreContent { backup: None, file: PathBuf::new() },
            source: String::new(),
            target: String::new(),
        }
    }

    fn content(id: &str, file: &str, depends_on: &[&str]) -> ContentChange {
        ContentChange { file: PathBuf::from(file), header: header(id, depends_on, 20), replacements: Vec::new() }
    }

    fn rename(id: &str, old: &str, new: &str) -> FileRename {
        FileRename {
            header: header(id, &[], 10),
            new_path: PathBuf::from(new),
            old_path: PathBuf::from(old),
            referenced_by: Vec::new(),
            update_references: true,
        }
    }

    #[test]
    fn edit_in_renamed_file_depends_on_rename() {
        let r = rename("r", "src/old.ts", "src/new.ts");
        let c = content("c", "src/new.ts", &[]);
        let graph = analyze(&[RefactorAction::Rename(&r), RefactorAction::Content(&c)]);

        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].from, "r");
        assert_eq!(graph.edges[0].kind, DependencyKind::FileDependency);
        assert_eq!(graph.files.get(Path::new("src/new.ts")).unwrap(), &vec!["r".to_string(), "c".to_string()]);
    }

    #[test]
    fn mutual_dependency_is_reported_as_full_cycle() {
        let a = content("a", "a.ts", &["b"]);
        let b = content("b", "b.ts", &["a"]);
        let graph = analyze(&[RefactorAction::Content(&a), RefactorAction::Content(&b)]);

        assert_eq!(graph.cycles, vec![vec!["a".to_string(), "b".to_string()]]);
        assert!(graph.topological_order().is_none());
    }

    #[test]
    fn kahn_releases_ready_nodes_by_priority_then_id() {
        let x = content("x", "x.ts", &[]);
        let r = rename("r", "old.ts", "new.ts");
        let y = content("y", "y.ts", &["x"]);
        let z = content("z", "new.ts", &[]);
        let graph = analyze(&[
            RefactorAction::Content(&x),
            RefactorAction::Rename(&r),
            RefactorAction::Content(&y),
            RefactorAction::Content(&z),
        ]);

        assert_eq!(graph.topological_order().unwrap(), vec!["r", "x", "y", "z"]);
    }

    #[test]
    fn swapped_renames_form_a_cycle() {
        let a = rename("a", "one.ts", "two.ts");
        let b = rename("b", "two.ts", "one.ts");
        let graph = analyze(&[RefactorAction::Rename(&a), RefactorAction::Rename(&b)]);
        assert_eq!(graph.cycles.len(), 1);
        assert_eq!(graph.cycles[0].len(), 2);
    }

    #[test]
    fn resolves_relative_specifiers() {
        let resolved = resolve_reference(Path::new("src/app.ts"), "./old-module");
        assert_eq!(resolved, PathBuf::from("src/old-module"));
        assert!(specifier_names(&resolved, Path::new("src/old-module.ts")));
        assert!(!specifier_names(&resolved, Path::new("src/old-module-two.ts")));
    }
}
