//! File collection for the CLI: walk the project, apply filters, read content.

use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::config::{CONFIG_FILE, Config};
use crate::error::Error;
use crate::types::SourceFile;

/// Walk `root` and read every file the config allows.
/// Paths are relative to `root`, sorted so collection order is stable.
/// Non-UTF-8 bytes are replaced, leaving binary detection to the scanner.
///
/// # Errors
///
/// Returns `Error::Io` if a selected file cannot be read.
pub fn collect(root: &Path, config: &Config) -> Result<Vec<SourceFile>, Error> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();

        let relative_str = relative.to_string_lossy().replace('\\', "/");
        if !config.should_scan(&relative_str) || relative == config.plan_file || relative_str == CONFIG_FILE {
            continue;
        }

        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        files.push(SourceFile::new(relative, content));
    }

    tracing::debug!(count = files.len(), root = %root.display(), "collected files");
    Ok(files)
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    components.iter().collect()
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {}
        Component::ParentDir => {
            let can_pop = matches!(components.last(), Some(c) if !matches!(c, Component::ParentDir));
            if can_pop { components.pop(); } else { components.push(component); }
        }
        other => components.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_relative_segments() {
        assert_eq!(normalize_path(Path::new("src/./lib/../old-module")), PathBuf::from("src/old-module"));
        assert_eq!(normalize_path(Path::new("../shared/x.ts")), PathBuf::from("../shared/x.ts"));
    }

    #[test]
    fn collects_with_filters_and_skips_plan_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "a").unwrap();
        std::fs::write(dir.path().join("vendor/b.ts"), "b").unwrap();
        std::fs::write(dir.path().join(".nameplan.plan.json"), "{}").unwrap();
        std::fs::write(
            dir.path().join(".nameplan.toml"),
            "exclude = [\"vendor/\", \".nameplan.toml\"]\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        let files = collect(dir.path(), &config).unwrap();

        let paths: Vec<&Path> = files.iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("src/a.ts")]);
    }
}
