//! File watcher: runs `validate` on startup, then re-runs on input changes.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands;
use crate::config::{self, Config};
use crate::error;

/// Debounce delay between filesystem events and re-validation.
const DEBOUNCE_MS: u64 = 100;

/// Directories holding the config and every validation input.
/// Env files and the root are watched non-recursively; report and
/// CI locations recursively.
fn collect_watch_dirs(root: &Path, config: &Config) -> BTreeSet<(PathBuf, bool)> {
    let mut dirs = BTreeSet::new();
    dirs.insert((root.to_path_buf(), false));

    let settings = &config.validation;
    for file in &settings.env_files {
        if let Some(parent) = file.parent() {
            dirs.insert((root.join(parent), false));
        }
    }
    if let Some(dir) = &settings.report_dir {
        dirs.insert((root.join(dir), true));
    }
    for path in &settings.ci_paths {
        let full = root.join(path);
        if full.is_dir() {
            dirs.insert((full, true));
        } else if let Some(parent) = path.parent() {
            dirs.insert((root.join(parent), false));
        }
    }
    return dirs;
}

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::Io` if the watcher cannot be created.
fn create_watcher(tx: crossbeam_channel::Sender<()>) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::Io(std::io::Error::other(format!("watcher setup failed: {e}")));
    });
}

/// Entry point for the watch command.
///
/// Runs an initial validation, then watches its inputs and re-validates on
/// changes. Fixes are never applied while watching.
///
/// # Errors
///
/// Returns errors from config loading or watcher setup.
pub fn run(json: bool) -> Result<ExitCode, error::Error> {
    let root = PathBuf::from(".");

    eprintln!("watch: initial validation");
    let mut last_code = run_validate(json);

    let config = Config::load(&root)?;
    let watch_dirs = collect_watch_dirs(&root, &config);

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;

    for (dir, recursive) in &watch_dirs {
        if !dir.exists() {
            tracing::debug!(dir = %dir.display(), "skipping missing watch directory");
            continue;
        }
        let mode = if *recursive { RecursiveMode::Recursive } else { RecursiveMode::NonRecursive };
        if let Err(e) = watcher.watch(dir, mode) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot watch directory");
        }
    }

    let dir_count = watch_dirs.len();
    eprintln!(
        "watch: monitoring {dir_count} directories ({} included), press Ctrl+C to stop",
        config::CONFIG_FILE
    );

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-validating...");
        last_code = run_validate(json);
    }

    return Ok(last_code);
}

/// Run validate once and print the result. Returns its exit code.
fn run_validate(json: bool) -> ExitCode {
    return match commands::validate(false, json) {
        Ok(code) => code,
        Err(e) => {
            crate::diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watches_root_and_validation_inputs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".github/workflows")).unwrap();
        let config = Config::parse(
            r#"
[validation]
env_files = ["config/.env"]
report_dir = "reports"
ci_paths = [".github/workflows", "ci.yml"]
"#,
        )
        .unwrap();

        let dirs = collect_watch_dirs(dir.path(), &config);
        assert!(dirs.contains(&(dir.path().to_path_buf(), false)));
        assert!(dirs.contains(&(dir.path().join("config"), false)));
        assert!(dirs.contains(&(dir.path().join("reports"), true)));
        assert!(dirs.contains(&(dir.path().join(".github/workflows"), true)));
        // "ci.yml" has an empty parent, which is the root again.
        assert_eq!(dirs.len(), 4);
    }
}
