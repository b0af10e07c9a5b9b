use std::fmt;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum MnError {
    /// Two vectors that must share a dimension do not, or a vector is empty.
    DimensionMismatch { expected: usize, actual: usize },
    /// A memory-type tag outside {conversation, fact, identity}.
    UnknownMemoryType(String),
    /// No event with this id is held by the store.
    EventNotFound(Uuid),
    /// A vector carrying NaN or infinite components.
    NonFiniteVector,
    /// A stored event that cannot be held: duplicate id, bad id, non-positive
    /// storage strength or non-finite fields.
    InvalidEvent(String),
    InvalidConfig(String),
}

impl fmt::Display for MnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MnError::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected}, got {actual}")
            }
            MnError::UnknownMemoryType(tag) => write!(f, "unknown memory type: '{tag}'"),
            MnError::EventNotFound(id) => write!(f, "event not found: {id}"),
            MnError::NonFiniteVector => write!(f, "vector has non-finite components"),
            MnError::InvalidEvent(msg) => write!(f, "invalid event: {msg}"),
            MnError::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for MnError {}

pub type Result<T> = std::result::Result<T, MnError>;
