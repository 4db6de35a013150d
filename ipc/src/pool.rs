//! Scratch parcel pool with scoped release
//!
//! Each call borrows a request and a reply parcel. The borrow is a
//! [`PooledParcel`] guard: dropping it clears the parcel and hands it back,
//! so release happens on every exit path, including `?` and panics.

use crate::Parcel;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Counters describing pool traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Parcels handed out since creation
    pub acquired: u64,
    /// Parcels handed back since creation
    pub released: u64,
    /// Parcels currently idle in the free list
    pub pooled: usize,
}

impl PoolStats {
    /// Parcels currently borrowed
    pub fn outstanding(&self) -> u64 {
        self.acquired - self.released
    }
}

/// Bounded free list of parcels
#[derive(Debug)]
pub struct ParcelPool {
    free: Mutex<Vec<Parcel>>,
    capacity: usize,
    initial_parcel_capacity: usize,
    max_parcel_size: usize,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl ParcelPool {
    /// Creates a pool keeping at most `capacity` idle parcels
    pub fn new(capacity: usize, initial_parcel_capacity: usize, max_parcel_size: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            initial_parcel_capacity,
            max_parcel_size,
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
        }
    }

    /// Borrows an empty parcel, reusing an idle one when available
    pub fn acquire(self: &Arc<Self>) -> PooledParcel {
        let reused = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let parcel = reused.unwrap_or_else(|| {
            Parcel::with_capacity(self.initial_parcel_capacity).with_max_size(self.max_parcel_size)
        });
        self.acquired.fetch_add(1, Ordering::Relaxed);
        PooledParcel {
            parcel,
            pool: Arc::clone(self),
        }
    }

    fn release(&self, mut parcel: Parcel) {
        self.released.fetch_add(1, Ordering::Relaxed);
        parcel.clear();
        parcel.set_max_size(self.max_parcel_size);
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < self.capacity {
            free.push(parcel);
        }
    }

    /// Returns a snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            pooled: self
                .free
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
        }
    }

    /// Maximum number of idle parcels kept
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A parcel borrowed from a [`ParcelPool`]; returned on drop
#[derive(Debug)]
pub struct PooledParcel {
    parcel: Parcel,
    pool: Arc<ParcelPool>,
}

impl Deref for PooledParcel {
    type Target = Parcel;

    fn deref(&self) -> &Parcel {
        &self.parcel
    }
}

impl DerefMut for PooledParcel {
    fn deref_mut(&mut self) -> &mut Parcel {
        &mut self.parcel
    }
}

impl Drop for PooledParcel {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.parcel));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> Arc<ParcelPool> {
        Arc::new(ParcelPool::new(capacity, 64, 1024))
    }

    #[test]
    fn test_acquire_release_accounting() {
        let pool = pool(4);
        {
            let mut a = pool.acquire();
            let _b = pool.acquire();
            a.write_i32(1).unwrap();
            assert_eq!(pool.stats().outstanding(), 2);
        }
        let stats = pool.stats();
        assert_eq!(stats.acquired, 2);
        assert_eq!(stats.released, 2);
        assert_eq!(stats.outstanding(), 0);
        assert_eq!(stats.pooled, 2);
    }

    #[test]
    fn test_reused_parcel_is_empty() {
        let pool = pool(1);
        {
            let mut parcel = pool.acquire();
            parcel.write_string("leftover").unwrap();
        }
        let parcel = pool.acquire();
        assert_eq!(parcel.data_size(), 0);
        assert_eq!(parcel.data_position(), 0);
        assert_eq!(parcel.max_size(), 1024);
    }

    #[test]
    fn test_free_list_is_bounded() {
        let pool = pool(1);
        {
            let _a = pool.acquire();
            let _b = pool.acquire();
            let _c = pool.acquire();
        }
        assert_eq!(pool.stats().pooled, 1);
        assert_eq!(pool.stats().released, 3);
    }

    #[test]
    fn test_release_on_early_return() {
        fn fails(pool: &Arc<ParcelPool>) -> Result<(), crate::ParcelError> {
            let mut parcel = pool.acquire();
            parcel.read_i32()?;
            Ok(())
        }

        let pool = pool(2);
        assert!(fails(&pool).is_err());
        assert_eq!(pool.stats().outstanding(), 0);
    }

    #[test]
    fn test_pool_limits_parcel_size() {
        let pool = pool(1);
        let mut parcel = pool.acquire();
        assert!(parcel.write_raw(&[0; 2048]).is_err());
    }
}
