// OM1 Core Library
// Agent runtime pieces shared by capability crates

pub mod background;
pub mod config;
pub mod factory;
pub mod singleton;

// Export core types
pub use background::{Background, BackgroundManager};
pub use config::BackgroundConfig;
pub use factory::{BackgroundConstructor, BackgroundRegistry};

// Error types
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Om1Error {
    #[error("Background error: {0}")]
    BackgroundError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Provider is not running")]
    NotRunning,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Om1Error>;
