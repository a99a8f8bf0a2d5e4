use haqei_iching::IchingError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NarrativeError>;

#[derive(Error, Debug)]
pub enum NarrativeError {
    /// The base table has no row for a line the walk reached
    #[error("Missing base row for hexagram {hexagram} line {position}")]
    MissingData { hexagram: u8, position: u8 },

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Failed to load bundle for hexagram {hexagram}: {reason}")]
    BundleLoad { hexagram: u8, reason: String },

    #[error(transparent)]
    Iching(#[from] IchingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NarrativeError {
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrity(msg.into())
    }

    pub fn bundle_load(hexagram: u8, reason: impl Into<String>) -> Self {
        Self::BundleLoad {
            hexagram,
            reason: reason.into(),
        }
    }
}
