use std::path::PathBuf;

/// Errors that can occur across truechurn.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary reports it through `miette`.
///
/// # Examples
///
/// ```
/// use truechurn_core::ChurnError;
///
/// let err = ChurnError::Parse("invalid hunk header: -x +1".into());
/// assert!(err.to_string().contains("-x +1"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ChurnError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Malformed diff text, most often a hunk header.
    #[error("parse error: {0}")]
    Parse(String),

    /// Diff output for a commit was not valid UTF-8.
    #[error("failed to decode diff of commit {commit}: {reason}")]
    #[diagnostic(help("the commit contains text in an encoding other than UTF-8"))]
    Decode {
        /// Commit whose diff could not be decoded.
        commit: String,
        /// Underlying decoder message.
        reason: String,
    },

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
