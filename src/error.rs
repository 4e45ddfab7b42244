//! The error type returned by [`DiskQueue`](crate::DiskQueue)'s public operations.

use std::io;

use snafu::Snafu;

/// Errors that a [`DiskQueue`](crate::DiskQueue) operation can return to its caller.
///
/// This is deliberately narrower than the internal per-module error enums
/// ([`CodecError`](crate::record::CodecError), [`LoadMetadataError`](crate::metadata::LoadMetadataError),
/// [`ConfigError`](crate::config::ConfigError)): those describe *why* the I/O loop failed
/// internally and are logged there, while `QueueError` describes what a caller of `put`/`read_chan`
/// needs to know to react.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum QueueError {
    /// The queue has been closed or deleted and no longer accepts requests.
    #[snafu(display("queue is exiting"))]
    Exiting,

    /// A message exceeded the configured `min_msg_size`/`max_msg_size` bounds.
    #[snafu(display("message size {} is outside the configured [{}, {}] bounds", len, min, max))]
    InvalidMessageSize { len: usize, min: i32, max: i32 },

    /// The I/O loop encountered an unrecoverable filesystem error.
    #[snafu(display("disk queue I/O error: {}", source))]
    Io { source: io::Error },
}

impl From<io::Error> for QueueError {
    fn from(source: io::Error) -> Self {
        Self::Io { source }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
