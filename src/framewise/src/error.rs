use std::{error::Error as StdError, io};

use thiserror::Error;

/// A boxed error produced by a value's own binary encoding.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors that may occur when encoding or decoding framed data.
#[derive(Debug, Error)]
pub enum Error {
    /// The payload does not fit into the length header of its field.
    #[error("payload of {len} bytes is too large; header allows at most {max}")]
    PayloadTooLarge { len: usize, max: usize },

    /// An empty payload was given where at least one byte is needed.
    #[error("payload is too small")]
    PayloadTooSmall,

    /// The encoder was finalized and does not accept more data.
    #[error("encoder has been released and could not accept more data")]
    Released,

    /// Reading from the input source failed or it ended prematurely.
    #[error("can't read next {wanted} bytes of data: {source}")]
    Read {
        wanted: usize,
        #[source]
        source: io::Error,
    },

    /// A value failed to produce its binary representation.
    #[error("failed to marshal value: {0}")]
    Marshal(#[source] BoxError),

    /// A value failed to restore itself from its binary representation.
    #[error("failed to unmarshal value: {0}")]
    Unmarshal(#[source] BoxError),
}

impl Error {
    #[cold]
    #[inline(never)]
    pub(crate) fn read(wanted: usize, source: io::Error) -> Self {
        log::debug!("Aborting read of {wanted} bytes: {source}");
        Self::Read { wanted, source }
    }

    #[inline]
    pub(crate) fn marshal<E: Into<BoxError>>(e: E) -> Self {
        Self::Marshal(e.into())
    }

    #[inline]
    pub(crate) fn unmarshal<E: Into<BoxError>>(e: E) -> Self {
        Self::Unmarshal(e.into())
    }
}

/// Shorthand for results of encoding and decoding operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
