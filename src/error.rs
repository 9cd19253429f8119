use thiserror::Error;

/// Startup-fatal problems with the environment the app was launched in.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// A failed lookup against the hosted search index. An empty hit list is
/// never reported through this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("search service unreachable: {0}")]
    Transport(String),
    #[error("search service returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed search response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LookupError::Decode(err.to_string())
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    #[error("map has not finished loading")]
    NotReady,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

#[derive(Debug, Error)]
pub enum TileError {
    #[error("tile request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("tile server returned {0}")]
    Status(reqwest::StatusCode),
    #[error("could not decode tile image: {0}")]
    Decode(#[from] image::ImageError),
}
