//! Error taxonomy for the scan pipeline

use std::time::Duration;

use thiserror::Error;

use crate::render::backend::BackendError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The frame source had nothing for this tick
    #[error("no frame available this tick")]
    NoFrameAvailable,

    /// The decoder found no valid code or failed outright
    #[error("decode failed: {reason}")]
    DecodeFailure { reason: String },

    /// A texture or material could not be allocated; the previous render
    /// configuration stays active
    #[error("failed to allocate {resource}: {reason}")]
    ResourceAllocation {
        resource: &'static str,
        reason: String,
    },

    /// The decode worker did not exit within the expected bound
    #[error("decode worker did not stop within {waited:?}")]
    WorkerShutdownTimeout { waited: Duration },

    #[error("failed to spawn decode worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("render state already disposed")]
    Disposed,
}

impl Error {
    /// Per-tick errors are skipped by the driver; everything else is
    /// surfaced to the owner.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::NoFrameAvailable | Error::DecodeFailure { .. } | Error::ResourceAllocation { .. }
        )
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Texture { reason, .. } => Error::ResourceAllocation {
                resource: "target texture",
                reason,
            },
            BackendError::Material { reason, .. } => Error::ResourceAllocation {
                resource: "material",
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_tick_errors_are_recoverable() {
        assert!(Error::NoFrameAvailable.is_recoverable());
        assert!(Error::DecodeFailure {
            reason: "blurry".into()
        }
        .is_recoverable());
        assert!(!Error::Disposed.is_recoverable());
        assert!(!Error::WorkerShutdownTimeout {
            waited: Duration::from_millis(5)
        }
        .is_recoverable());
    }

    #[test]
    fn backend_errors_map_to_allocation_failures() {
        let err: Error = BackendError::Texture {
            width: 0,
            height: 10,
            reason: "zero extent".into(),
        }
        .into();
        match err {
            Error::ResourceAllocation { resource, .. } => assert_eq!(resource, "target texture"),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
