//! Error types

use thiserror::Error;

use crate::player::EngineError;
use crate::stream::{Quality, StreamKey};
use crate::surface::ViewHandle;

/// Engine operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Stop,
    UpdateViews,
    UpdateQuality,
    SetRenderParams,
}

/// Error type for coordinator operations
#[derive(Debug, Error)]
pub enum Error {
    /// The view is not attached to the host surface tree
    #[error("view not found: {0}")]
    ViewNotFound(ViewHandle),

    /// The media engine rejected a call
    #[error("engine {operation:?} failed for {key} ({quality:?}): {source}")]
    Engine {
        operation: Operation,
        key: StreamKey,
        quality: Quality,
        #[source]
        source: EngineError,
    },

    /// The coordinator has been destroyed
    #[error("coordinator destroyed")]
    Destroyed,
}

impl Error {
    pub(crate) fn engine(
        operation: Operation,
        key: &StreamKey,
        quality: Quality,
        source: EngineError,
    ) -> Self {
        Error::Engine {
            operation,
            key: key.clone(),
            quality,
            source,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
