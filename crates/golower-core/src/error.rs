use crate::ir::Position;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The input uses a shape the lowering does not cover yet.
    #[error("{position}: unsupported: {message}")]
    Unsupported { position: Position, message: String },
    /// A precondition the engine itself is responsible for was violated.
    #[error("internal error: {0}")]
    Internal(String),
    #[error("structural optimizer: {0}")]
    Optimize(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Normalized failure reported by the top-level entry point.
    #[error("lowering {object}: {source}")]
    Generate {
        object: String,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = result::Result<T, Error>;

impl Error {
    pub fn is_unsupported(&self) -> bool {
        match self {
            Error::Unsupported { .. } => true,
            Error::Generate { source, .. } => source.is_unsupported(),
            _ => false,
        }
    }

    pub fn is_internal(&self) -> bool {
        match self {
            Error::Internal(_) => true,
            Error::Generate { source, .. } => source.is_internal(),
            _ => false,
        }
    }

    /// Wrap the error with the name of the object being lowered.
    pub fn in_object(self, object: impl Into<String>) -> Self {
        Error::Generate {
            object: object.into(),
            source: Box::new(self),
        }
    }
}

/// Create an unsupported-construct error anchored at a source position
pub fn unsupported(position: &Position, message: impl Into<String>) -> Error {
    Error::Unsupported {
        position: position.clone(),
        message: message.into(),
    }
}

/// Create an internal-consistency error
pub fn internal(message: impl Into<String>) -> Error {
    Error::Internal(message.into())
}

pub fn optimization_error(message: impl Into<String>) -> Error {
    Error::Optimize(message.into())
}
