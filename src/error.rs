//! Error types for the frame-extraction pipeline.
//!
//! "No frame yet" is not an error; it is reported as
//! [`FillStatus::Pending`](crate::source::FillStatus). The variants here cover
//! the faults a caller can actually act on. No retries happen internally —
//! recovery is always the caller's decision.

use std::path::PathBuf;

use thiserror::Error;

use crate::source::FourCc;

/// Result type alias for source operations.
pub type Result<T, E = SourceError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SourceError {
    /// `set_format` was called with a fourcc other than MJPG. Source state is
    /// left unchanged; the caller may retry with a supported format.
    #[error("unsupported fourcc {fourcc}, only MJPG is accepted")]
    InvalidFormat { fourcc: FourCc },

    /// The signal pipe could not be opened during lazy setup. Retryable: the
    /// producer may simply not have created the pipe yet.
    #[error("failed to open signal pipe {path}")]
    ChannelOpenFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A frame (plus scan look-back) would exceed a buffer: either the staging
    /// area overflowed before a terminator was seen, or the extracted frame
    /// does not fit the caller's destination. The scan buffer is reset before
    /// this is returned, so the stream stays usable.
    #[error("frame needs {needed} bytes but only {capacity} are available")]
    OversizedFrame { needed: usize, capacity: usize },

    /// Capability not implemented by this source kind. The pipe source owns no
    /// device buffer memory, so the buffer alloc/export operations report this.
    #[error("{0} is not supported by this source")]
    Unsupported(&'static str),

    /// The channel read failed mid-stream. `WouldBlock` never surfaces here;
    /// it maps to `FillStatus::Pending`.
    #[error("failed to read from signal pipe")]
    Read {
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Returns whether retrying the failed operation can succeed without any
    /// caller-side change.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SourceError::ChannelOpenFailure { .. } | SourceError::Read { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<SourceError>();
    }

    #[test]
    fn open_failure_is_retryable_format_is_not() {
        let open = SourceError::ChannelOpenFailure {
            path: PathBuf::from("/run/frames.fifo"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(open.is_retryable());

        let format = SourceError::InvalidFormat {
            fourcc: FourCc::new(*b"YUYV"),
        };
        assert!(!format.is_retryable());
        assert!(format.to_string().contains("YUYV"));
    }
}
