use haqei_narrative::NarrativeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, QaError>;

#[derive(Error, Debug)]
pub enum QaError {
    #[error("Invalid QA configuration: {0}")]
    Config(String),

    #[error("Failed to parse QA configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Narrative(#[from] NarrativeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
