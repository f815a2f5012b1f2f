//! Symmetric binary framing over pooled buffers.
//!
//! An [`Encoder`] appends scalars, length-prefixed blobs and values
//! with their own binary representation to a byte sequence. A
//! [`Decoder`] reads them back in the same order, from memory or
//! from a stream.
//!
//! # Wire format
//!
//! There is no magic number or versioning; framing is positional and
//! entirely defined by the order of calls.
//!
//! | Primitive                | Encoding                                    |
//! |--------------------------|---------------------------------------------|
//! | Integers, [`bool`]       | Fixed width, big-endian                     |
//! | Variadic, byte header    | [`u8`] length, then up to 255 bytes         |
//! | Variadic, 2-byte header  | [`u16`] length, then up to 65535 bytes      |
//! | Fixed-size segment       | Raw bytes, length known out of band         |
//! | Big integer              | Magnitude bytes with a byte header          |
//! | Timestamp                | See [`time`], with a byte header            |
//! | String                   | UTF-8 bytes with a 2-byte header            |
//!
//! # Memory
//!
//! Encoders and decoders draw their scratch and accumulation buffers
//! from the global pools in [`framewise_pool`]. All bytes handed out
//! to callers are owned copies, so they stay valid regardless of what
//! later sessions do with the pooled memory.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use chrono;
pub use num_bigint;

pub mod binary;
pub use binary::{BinaryMarshal, BinaryUnmarshal};

mod decoder;
pub use decoder::Decoder;

mod encoder;
pub use encoder::Encoder;

mod error;
pub use error::{BoxError, Error, Result};

pub mod time;
pub use time::{TimeError, Timestamp};
