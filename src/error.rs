//! Error types for ignition-rs

use thiserror::Error;

/// Main error type for ignition-rs operations
#[derive(Error, Debug)]
pub enum IgnitionError {
    /// The provider does not apply to this machine; try the next one
    #[error("config provider not applicable")]
    NoProvider,

    #[error("not a config (empty)")]
    Empty,

    #[error("not a config (found coreos-cloudinit config)")]
    CloudConfig,

    #[error("not a config (found coreos-cloudinit script)")]
    Script,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config value does not match the schema at line {line}, column {column}")]
    InvalidValue { line: usize, column: usize },

    #[error("invalid config version: {0}")]
    InvalidVersion(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),

    #[error("config is not valid")]
    InvalidConfig,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported URL scheme: {0:?}")]
    UnsupportedScheme(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid data URL: {0}")]
    InvalidData(String),

    #[error("content verification failed: expected {expected}, got {actual}")]
    Verification { expected: String, actual: String },

    #[error("invalid hash declaration: {0}")]
    InvalidHash(String),

    #[error("certificate error: {0}")]
    Certificate(String),

    #[error("decompression error: {0}")]
    Compression(String),

    #[error("config references nested deeper than {0} levels")]
    RenderDepth(usize),

    #[error("config reference cycle through {0}")]
    ReferenceCycle(String),

    #[error("config cache at {path} is corrupt: {message}")]
    Cache { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown stage: {0:?}")]
    UnknownStage(String),

    #[error("unknown platform: {0:?}")]
    UnknownPlatform(String),

    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },
}

impl IgnitionError {
    /// Create a stage error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Whether the user-provided source was readable but is not a config.
    ///
    /// These conditions substitute the platform default config instead of
    /// aborting the run.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::Empty | Self::CloudConfig | Self::Script)
    }
}
