use thiserror::Error;

#[derive(Debug, Error)]
pub enum ElectionError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("No results found")]
    NotFound,
    #[error("storage failure: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ElectionError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ElectionError>;
