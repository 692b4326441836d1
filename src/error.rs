use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("plugin '{kind}' is listed more than once")]
    DuplicatePlugin { kind: &'static str },

    #[error("unknown theme category '{category}'")]
    UnknownThemeCategory { category: String },

    #[error("unknown component theme '{name}'")]
    UnknownComponentTheme { name: String },

    #[error("invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("failed to read input css {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionLoadError {
    #[error("collection '{name}' not found")]
    NotFound { name: String },

    #[error("failed to read collection '{name}': {message}")]
    Io { name: String, message: String },

    #[error("failed to parse collection '{name}': {message}")]
    Parse { name: String, message: String },

    #[error("loading collection '{name}' timed out after {timeout_ms}ms")]
    TimedOut { name: String, timeout_ms: u64 },

    #[error("loader for collection '{name}' stopped without a result")]
    LoaderPanicked { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("run cancelled")]
    Cancelled,
}
