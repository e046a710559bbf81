use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Format error: {0}")]
    Format(String),
    #[error("Cache error: {0}")]
    Cache(String),
    #[error("Download error: {0}")]
    Download(String),
}

impl From<std::io::Error> for CoreError {
    fn from(error: std::io::Error) -> Self {
        CoreError::Io(error.to_string())
    }
}

impl Serialize for CoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
