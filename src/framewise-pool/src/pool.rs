use std::{
    fmt,
    ops::{Deref, DerefMut},
};

use crossbeam_queue::ArrayQueue;

/// The largest allocation an accumulator may keep while idle in a pool.
///
/// Buffers which grew beyond this during a session are shrunk when they
/// are released so that one oversized payload doesn't pin its memory.
pub const MAX_RETAINED_CAPACITY: usize = 64 * 1024;

/// Size of a [`Scratch`] buffer in bytes.
pub const SCRATCH_SIZE: usize = 8;

/// Elements which can be stored in a [`Pool`] and handed out again.
pub trait Reusable {
    /// Creates a new element for when the pool is empty.
    fn fresh() -> Self;

    /// Brings a released element back into a state that is
    /// indistinguishable from [`Reusable::fresh`] to its next user.
    fn reset(&mut self);
}

impl Reusable for Vec<u8> {
    #[inline]
    fn fresh() -> Self {
        Vec::new()
    }

    #[inline]
    fn reset(&mut self) {
        self.clear();
        if self.capacity() > MAX_RETAINED_CAPACITY {
            self.shrink_to(MAX_RETAINED_CAPACITY);
        }
    }
}

/// A small fixed-capacity buffer for fixed-width reads and writes.
///
/// Contents are never cleared between uses. Every user writes an
/// explicit byte range before reading it back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Scratch([u8; SCRATCH_SIZE]);

impl Deref for Scratch {
    type Target = [u8; SCRATCH_SIZE];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Scratch {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Reusable for Scratch {
    #[inline]
    fn fresh() -> Self {
        Self::default()
    }

    #[inline]
    fn reset(&mut self) {}
}

/// A pool which stores reusable elements and hands them out on demand.
///
/// Memory will be reused to avoid allocations when elements are
/// available for use. The pool may be shared freely between threads.
pub struct Pool<T> {
    queue: ArrayQueue<T>,
}

impl<T: Reusable> Pool<T> {
    /// Creates a new pool with an upper bound of idle elements
    /// it can store at the same time.
    ///
    /// # Panics
    ///
    /// Panics when `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity),
        }
    }

    /// Inserts a new element into the pool, which is initialized
    /// by the given closure.
    pub fn create_with<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut value = T::fresh();
        f(&mut value);

        // Only the memory `f` may have allocated is worth keeping.
        value.reset();
        let _ = self.queue.push(value);
    }

    /// Gets an element from the pool or creates a fresh one to
    /// be inserted when the ref is dropped.
    pub fn get(&self) -> PoolRef<'_, T> {
        let inner = self.queue.pop().unwrap_or_else(|| {
            log::trace!("Pool exhausted; allocating a fresh element");
            T::fresh()
        });

        PoolRef {
            pool: self,
            inner: Some(inner),
        }
    }

    /// Gets the number of idle elements currently held by the pool.
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Gets the maximum number of idle elements the pool retains.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    fn put_back(&self, mut value: T) {
        value.reset();
        if self.queue.push(value).is_err() {
            log::trace!("Pool is full; dropping released element");
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("available", &self.queue.len())
            .field("capacity", &self.queue.capacity())
            .finish()
    }
}

/// A reference to an element from a [`Pool`], enabling mutable
/// and immutable access to the element.
///
/// When this value is dropped, the element will be reset and
/// inserted back into the pool.
pub struct PoolRef<'p, T: Reusable> {
    pool: &'p Pool<T>,
    inner: Option<T>,
}

impl<T: Reusable> PoolRef<'_, T> {
    /// Hands the element back to its pool.
    ///
    /// This is the same as dropping the ref and only exists to make
    /// the release point explicit at call sites.
    #[inline]
    pub fn release(self) {
        drop(self);
    }
}

impl<T: Reusable> Deref for PoolRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        // `inner` is only taken in `drop`.
        match &self.inner {
            Some(v) => v,
            None => unreachable!(),
        }
    }
}

impl<T: Reusable> DerefMut for PoolRef<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match &mut self.inner {
            Some(v) => v,
            None => unreachable!(),
        }
    }
}

impl<T: Reusable + fmt::Debug> fmt::Debug for PoolRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PoolRef").field(&self.inner).finish()
    }
}

impl<T: Reusable> Drop for PoolRef<'_, T> {
    fn drop(&mut self) {
        if let Some(value) = self.inner.take() {
            self.pool.put_back(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_reset_keeps_small_allocations() {
        let mut v = Vec::with_capacity(128);
        v.extend_from_slice(b"leftover");
        v.reset();

        assert!(v.is_empty());
        assert!(v.capacity() >= 128);
    }

    #[test]
    fn vec_reset_shrinks_oversized_allocations() {
        let mut v = vec![0u8; MAX_RETAINED_CAPACITY * 2];
        v.reset();

        assert!(v.is_empty());
        assert!(v.capacity() <= MAX_RETAINED_CAPACITY);
    }

    #[test]
    fn create_with_stores_cleared_element() {
        let pool = Pool::<Vec<u8>>::new(2);
        pool.create_with(|v| v.extend_from_slice(&[1, 2, 3]));

        assert_eq!(pool.available(), 1);
        let v = pool.get();
        assert!(v.is_empty());
        assert!(v.capacity() >= 3);
    }
}
