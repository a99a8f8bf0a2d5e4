use thiserror::Error;

/// Result type for hexagram table operations
pub type Result<T> = std::result::Result<T, IchingError>;

/// Errors raised at the boundary where raw numbers and strings become typed values
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IchingError {
    /// Hexagram number outside 1..=64
    #[error("Invalid hexagram number: {0} (expected 1..=64)")]
    InvalidHexagram(u32),

    /// Line position outside 1..=6
    #[error("Invalid line position: {0} (expected 1..=6)")]
    InvalidPosition(u32),

    /// Path signature that is not three characters over {J, H}
    #[error("Invalid path signature: {0:?} (expected 3 characters over J/H)")]
    InvalidPathSignature(String),

    /// Hexagram name that does not resolve to a canonical name
    #[error("Unknown hexagram name: {0}")]
    UnknownHexagramName(String),

    /// Line name that does not match any yao label
    #[error("Unknown line name: {0}")]
    UnknownLineName(String),

    /// Static table is inconsistent with itself
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
}

impl IchingError {
    /// Create a data integrity error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::DataIntegrity(msg.into())
    }
}
