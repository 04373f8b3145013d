/// Crate-level error types for nameplan diagnostics.
use std::path::PathBuf;

/// All errors in nameplan carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, pattern, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-wide error type shared by lib and binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced config file does not exist on disk.
    #[error("config not found: {}", path.display())]
    ConfigNotFound {
        /// Path to the missing config file.
        path: PathBuf,
    },

    /// A referenced file does not exist on disk.
    #[error("file not found: {}", path.display())]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// A context rule's file glob failed to compile.
    #[error("invalid glob `{glob}` in pattern `{pattern}`: {reason}")]
    InvalidGlob {
        /// The glob text as written in the rule set.
        glob: String,
        /// Identifier of the pattern owning the rule.
        pattern: String,
        /// Compiler message from globset.
        reason: String,
    },

    /// Malformed data was handed to a pure function. Always a contract
    /// violation by the caller, never corrected silently.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// What was malformed and where.
        reason: String,
    },

    /// A naming pattern's regular expression failed to compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Identifier of the offending pattern.
        pattern: String,
        /// Compiler message from the regex crate.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// An input file (env file, report) could not be parsed.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// The file that failed to parse.
        file: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// A persisted plan parsed but is structurally inconsistent.
    #[error("plan corrupt: {reason}")]
    PlanCorrupt {
        /// Description of the inconsistency.
        reason: String,
    },

    /// Expected plan file does not exist on disk.
    #[error("plan not found: {}", path.display())]
    PlanNotFound {
        /// Path to the missing plan file.
        path: PathBuf,
    },

    /// `optimize_plan` refused a plan carrying error-level findings.
    #[error("plan rejected: {count} blocking finding(s), first: {first}")]
    PlanRejected {
        /// Number of error-level findings.
        count: usize,
        /// Message of the first finding, for the one-line summary.
        first: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}

impl Error {
    /// Machine-readable code, stable across releases.
    pub const fn code(&self) -> &'static str {
        return match self {
            Self::ConfigNotFound { .. } => "config-not-found",
            Self::FileNotFound { .. } => "file-not-found",
            Self::InvalidGlob { .. } | Self::InvalidPattern { .. } => "invalid-rule",
            Self::InvalidInput { .. } => "invalid-input",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::ParseFailed { .. } => "parse-failed",
            Self::PlanCorrupt { .. } => "plan-corrupt",
            Self::PlanNotFound { .. } => "plan-not-found",
            Self::PlanRejected { .. } => "plan-rejected",
            Self::TomlDe(_) => "toml",
        };
    }
}
