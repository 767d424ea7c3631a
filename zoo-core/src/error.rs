//! Error types for the zoo simulation

use crate::types::Species;
use thiserror::Error;

/// Domain and I/O errors surfaced by the zoo core
#[derive(Error, Debug)]
pub enum ZooError {
    #[error("Enclosure \"{name}\" is full ({capacity} animals), cannot add more")]
    EnclosureFull { name: String, capacity: usize },

    #[error("Enclosure capacity must be greater than 0")]
    InvalidCapacity,

    #[error("Invalid animal: {0}")]
    InvalidAnimal(String),

    #[error("Enclosure \"{enclosure}\" holds {expected} animals, cannot add {actual} \"{name}\"")]
    SpeciesMismatch {
        enclosure: String,
        expected: Species,
        actual: Species,
        name: String,
    },

    #[error("No enclosure for species {0}")]
    NoEnclosure(Species),

    #[error("No keepers in the zoo")]
    NoKeepers,

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error("No tokio runtime available to spawn {0}")]
    NoRuntime(String),

    #[error("Background task failed: {0}")]
    TaskFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("Invalid roster: {0}")]
    InvalidRoster(String),
}

impl ZooError {
    /// Domain errors are expected simulation outcomes; everything else is a
    /// system failure
    pub fn is_domain(&self) -> bool {
        !matches!(
            self,
            ZooError::Io(_)
                | ZooError::Json(_)
                | ZooError::Xml(_)
                | ZooError::InvalidRoster(_)
                | ZooError::NoRuntime(_)
                | ZooError::TaskFailed(_)
        )
    }
}
