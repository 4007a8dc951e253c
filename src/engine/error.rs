//! Custom error types for the quickdic crate.

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum DictError {
    /// An error originating from I/O operations outside the format itself.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// The dictionary file version is outside the range this engine understands.
    #[error("Unsupported dictionary version: {0}. Only versions 0 through {max} are supported.", max = crate::engine::CURRENT_VERSION)]
    UnsupportedVersion(i32),

    /// The file is structurally damaged: bad sentinel, inconsistent offset
    /// table, negative count, short read, or an undecodable payload.
    #[error("Dictionary seems corrupt: {0}")]
    Corrupt(String),

    /// A fault raised while constructing one of the lazy sections during
    /// open, re-signaled uniformly with the original cause attached.
    #[error("Failed to load dictionary section")]
    Load(#[source] Box<DictError>),
}

impl DictError {
    /// True if this error (or the cause inside a [`DictError::Load`]
    /// wrapper) indicates structural damage rather than an external fault.
    pub fn is_corruption(&self) -> bool {
        match self {
            DictError::Corrupt(_) => true,
            DictError::Load(cause) => cause.is_corruption(),
            _ => false,
        }
    }
}

/// A convenience `Result` type alias using the crate's `DictError` type.
pub type Result<T> = std::result::Result<T, DictError>;
