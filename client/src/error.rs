use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoadError>;

/// A backend request that produced no usable data.
///
/// Never merged partially: callers keep whatever they held before.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server returned HTTP {status}")]
    Status { status: u16 },

    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server reported failure: {0}")]
    Rejected(String),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("no data directory available on this platform")]
    NoDataDir,

    #[error("profile io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("profile is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}
