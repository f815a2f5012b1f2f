use std::{env, thread};

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::{Pool, Scratch};

/// Environment variable bounding the idle set of each global pool.
pub const FRAMEWISE_POOL_CAPACITY: &str = "FRAMEWISE_POOL_CAPACITY";

// Headroom on top of one buffer per thread, for sessions which hold
// their buffers while others are being released.
const CAPACITY_THRESHOLD: usize = 8;

#[derive(Clone, Debug, Error)]
#[error(
    "invalid value in {}; must be a natural number",
    FRAMEWISE_POOL_CAPACITY
)]
pub struct BadConfiguration;

#[inline]
fn default_capacity() -> usize {
    let threads = thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(1);

    threads + CAPACITY_THRESHOLD
}

fn parse_capacity(value: &str) -> Result<usize, BadConfiguration> {
    match value.trim().parse() {
        Ok(0) | Err(_) => Err(BadConfiguration),
        Ok(n) => Ok(n),
    }
}

/// Determines the capacity for the global pools.
///
/// Reads [`FRAMEWISE_POOL_CAPACITY`] if set, falling back to the
/// available parallelism plus some headroom otherwise.
pub fn configured_capacity() -> Result<usize, BadConfiguration> {
    match env::var(FRAMEWISE_POOL_CAPACITY) {
        Ok(value) => parse_capacity(&value),
        Err(_) => Ok(default_capacity()),
    }
}

fn global_capacity() -> usize {
    configured_capacity().unwrap_or_else(|e| {
        log::warn!("{e}; using default pool capacity");
        default_capacity()
    })
}

static SCRATCH: Lazy<Pool<Scratch>> = Lazy::new(|| Pool::new(global_capacity()));

static PAYLOAD: Lazy<Pool<Vec<u8>>> = Lazy::new(|| Pool::new(global_capacity()));

/// Gets the process-wide pool of 8-byte scratch buffers.
#[inline]
pub fn scratch() -> &'static Pool<Scratch> {
    &SCRATCH
}

/// Gets the process-wide pool of growable byte accumulators.
#[inline]
pub fn payload() -> &'static Pool<Vec<u8>> {
    &PAYLOAD
}
