use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to encode or decode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("login rejected: {0}")]
    LoginRejected(String),
    #[error("failed to write preference file {path}: {source}", path = path.display())]
    PreferencesWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
