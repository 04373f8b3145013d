use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::rules::{PatternSpec, RuleSet};

/// Config file name, looked up in the project root.
pub const CONFIG_FILE: &str = ".nameplan.toml";

/// Default location of the persisted plan.
const DEFAULT_PLAN_FILE: &str = ".nameplan.plan.json";

/// Project configuration loaded from `.nameplan.toml`.
/// Include/exclude patterns are path prefixes applied to project files.
#[derive(Debug, Clone)]
pub struct Config {
    exclude: Vec<String>,
    include: Vec<String>,
    /// Scanner size bound in bytes.
    pub max_file_bytes: Option<u64>,
    /// Naming patterns, uncompiled.
    pub patterns: Vec<PatternSpec>,
    /// Where `plan` writes and `check` reads the plan.
    pub plan_file: PathBuf,
    /// Inputs for the validation runner.
    pub validation: ValidationSettings,
}

/// The `[validation]` table.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    /// Path prefixes of CI configuration files or directories.
    pub ci_paths: Vec<PathBuf>,
    /// Dotenv files whose keys are checked.
    pub env_files: Vec<PathBuf>,
    /// Required prefix for every environment key.
    pub env_prefix: Option<String>,
    /// Directory holding generated JSON reports.
    pub report_dir: Option<PathBuf>,
    /// Steps every CI configuration must run somewhere.
    pub required_ci_steps: Vec<String>,
    /// Fields every generated report must carry.
    pub required_report_fields: Vec<String>,
}

/// Raw TOML structure for `.nameplan.toml`.
#[derive(serde::Deserialize)]
struct NameplanTomlConfig {
    #[serde(default = "default_exclude")]
    exclude: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    max_file_bytes: Option<u64>,
    #[serde(default)]
    patterns: Vec<PatternSpec>,
    #[serde(default)]
    plan_file: Option<PathBuf>,
    #[serde(default)]
    validation: ValidationSettings,
}

fn default_exclude() -> Vec<String> {
    vec!["node_modules/".to_string(), "target/".to_string()]
}

impl Config {
    /// Load config from `.nameplan.toml` in the given root directory.
    /// Returns a default with no patterns if the file doesn't exist.
    /// Returns an error if the file exists but is malformed. Never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        Self::parse(&content)
    }

    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: NameplanTomlConfig = toml::from_str(content)?;
        Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            max_file_bytes: raw.max_file_bytes,
            patterns: raw.patterns,
            plan_file: raw.plan_file.unwrap_or_else(|| PathBuf::from(DEFAULT_PLAN_FILE)),
            validation: raw.validation,
        })
    }

    /// Compile the configured patterns.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` or `Error::InvalidGlob` for the first bad rule.
    pub fn rule_set(&self) -> Result<RuleSet, Error> {
        RuleSet::compile(&self.patterns)
    }

    /// Check whether a project file should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        !self.exclude.iter().any(|p| relative_path.starts_with(p.as_str()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            include: Vec::new(),
            max_file_bytes: None,
            patterns: Vec::new(),
            plan_file: PathBuf::from(DEFAULT_PLAN_FILE),
            validation: ValidationSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    #[test]
    fn parses_patterns_and_validation_table() {
        let config = Config::parse(
            r#"
include = ["src/"]
max_file_bytes = 1024

[[patterns]]
id = "env-prefix"
category = "environment"
incorrect = ['\bWRONG_([A-Z]+)\b']

[[patterns.rules]]
glob = "*.ts"
replacement = "APP_$1"

[validation]
env_prefix = "APP_"
required_ci_steps = ["nameplan validate"]
"#,
        )
        .unwrap();

        assert_eq!(config.patterns.len(), 1);
        assert_eq!(config.patterns[0].category, Category::Environment);
        assert_eq!(config.max_file_bytes, Some(1024));
        assert_eq!(config.validation.env_prefix.as_deref(), Some("APP_"));
        assert!(config.should_scan("src/app.ts"));
        assert!(!config.should_scan("docs/app.md"));
        assert_eq!(config.rule_set().unwrap().len(), 1);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.patterns.is_empty());
        assert!(!config.should_scan("node_modules/x.js"));
        assert_eq!(config.plan_file, PathBuf::from(".nameplan.plan.json"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "include = [").unwrap();
        assert!(matches!(Config::load(dir.path()), Err(Error::TomlDe(_))));
    }
}
