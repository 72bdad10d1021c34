pub mod config;
pub mod error;
pub mod tag;
pub mod types;

pub use config::OrchestratorConfig;
pub use error::{MiniGameError, Result};
pub use tag::Tag;
pub use types::{OrchestratorId, RequesterId, Rotator, RunId, ViewTransform};
