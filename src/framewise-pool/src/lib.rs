//! Pools of reusable buffers for low-allocation encoding and decoding.
//!
//! # Design
//!
//! Two process-wide pools back every encoding and decoding session:
//! one of small [`Scratch`] buffers for fixed-width values and one of
//! growable byte vectors which accumulate whole payloads.
//!
//! Pools are bounded, lock-free queues. Taking an element out never
//! fails; when the pool is empty a fresh one is created instead.
//! Elements are reset and returned when their [`PoolRef`] drops, and
//! discarded if the pool is already full at that point.
//!
//! The size of the global pools can be configured with the
//! `FRAMEWISE_POOL_CAPACITY` environment variable.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod global;
pub use global::*;

mod pool;
pub use pool::*;
