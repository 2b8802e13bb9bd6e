use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown mirror: '{0}'. Use 'list' to see available mirrors.")]
    UnknownMirror(String),

    #[error("No mirror reachable: every probe failed. Please check your network connection.")]
    NoData,
}

pub type Result<T> = std::result::Result<T, MirrorError>;
