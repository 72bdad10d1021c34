use thiserror::Error;

use crate::core::tag::Tag;

#[derive(Error, Debug)]
pub enum MiniGameError {
    #[error("Mini-game config not found: {0}")]
    ConfigNotFound(Tag),

    #[error("A mini-game is already active: {0}")]
    AlreadyActive(Tag),

    #[error("Handler spawn failed: {0}")]
    HandlerSpawnFailed(String),

    #[error("Station not available for mini-game: {0}")]
    StationUnavailable(Tag),

    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<toml::de::Error> for MiniGameError {
    fn from(e: toml::de::Error) -> Self {
        MiniGameError::ParseError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MiniGameError>;
