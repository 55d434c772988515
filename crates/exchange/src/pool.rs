//! Reuse pool for per-exchange state.
//!
//! A [`Pool`] hands out [`Pooled`] handles wrapping an instance that has just
//! been [`Reset`]. Handles are move-only: giving one back with
//! [`Pool::release`] consumes it, so an instance cannot be released twice or
//! touched after release. Nothing is returned to the pool implicitly; a handle
//! that is dropped frees its slot and the instance is discarded.
//!
//! # Sizing
//!
//! - `max_outstanding: None` grows without bound and never blocks.
//! - `max_outstanding: Some(n)` allows `n` instances checked out at once.
//!   [`Pool::acquire`] then fails with [`PoolError::Exhausted`], while
//!   [`Pool::acquire_wait`] waits for a release.
//! - `max_idle` caps how many released instances are kept for reuse.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, trace, warn};

use crate::ensure;
use crate::protocol::{Headers, PoolError};

/// Default number of idle instances a pool keeps around.
pub const DEFAULT_MAX_IDLE: usize = 1_000;

/// Largest `max_outstanding` a bounded pool accepts.
pub const MAX_OUTSTANDING: usize = Semaphore::MAX_PERMITS;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Types that can be returned to a pristine state for reuse.
pub trait Reset {
    /// Clears every piece of per-exchange state.
    fn reset(&mut self);
}

impl Reset for Headers {
    fn reset(&mut self) {
        Headers::reset(self);
    }
}

/// Sizing policy of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum instances checked out at once, `None` for unbounded.
    pub max_outstanding: Option<usize>,
    /// Maximum released instances kept for reuse.
    pub max_idle: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_outstanding: None, max_idle: DEFAULT_MAX_IDLE }
    }
}

impl PoolConfig {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(max_outstanding: usize) -> Self {
        Self { max_outstanding: Some(max_outstanding), ..Self::default() }
    }

    #[must_use]
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Checks that a bounded pool allows between one and [`MAX_OUTSTANDING`]
    /// instances out at once.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidSize`] for a bound outside that range.
    pub fn validate(&self) -> Result<(), PoolError> {
        if let Some(max_outstanding) = self.max_outstanding {
            ensure!(
                (1..=MAX_OUTSTANDING).contains(&max_outstanding),
                PoolError::invalid_size(max_outstanding, MAX_OUTSTANDING)
            );
        }
        Ok(())
    }
}

/// Point-in-time counters of a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Released instances waiting for reuse.
    pub idle: usize,
    /// Instances currently checked out.
    pub outstanding: usize,
    /// Instances built by the factory.
    pub created: u64,
    /// Acquisitions served from the idle set.
    pub reused: u64,
    /// Handles dropped without being released.
    pub abandoned: u64,
}

type Factory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// A thread-safe pool of reusable instances of `T`, reset between uses.
pub struct Pool<T> {
    id: u64,
    config: PoolConfig,
    idle: Mutex<Vec<T>>,
    slots: Option<Arc<Semaphore>>,
    factory: Factory<T>,
    outstanding: Arc<AtomicUsize>,
    created: AtomicU64,
    reused: AtomicU64,
    abandoned: Arc<AtomicU64>,
}

impl<T> Pool<T>
where
    T: Reset + Default + 'static,
{
    /// Creates a pool building fresh instances with `T::default()`.
    pub fn new(config: PoolConfig) -> Self {
        Self::with_factory(config, T::default)
    }
}

impl<T> Pool<T>
where
    T: Reset,
{
    /// Creates a pool building fresh instances with `factory`.
    ///
    /// A `max_outstanding` outside `1..=MAX_OUTSTANDING` is clamped into that
    /// range; use [`PoolConfig::validate`] to reject it instead.
    pub fn with_factory<F>(mut config: PoolConfig, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        if let Some(max_outstanding) = config.max_outstanding {
            let clamped = max_outstanding.clamp(1, MAX_OUTSTANDING);
            if clamped != max_outstanding {
                warn!(pool_id = id, max_outstanding, clamped, "max outstanding out of range, clamp it");
                config.max_outstanding = Some(clamped);
            }
        }
        debug!(pool_id = id, max_outstanding = ?config.max_outstanding, max_idle = config.max_idle, "create object pool");
        Self {
            id,
            config,
            idle: Mutex::new(Vec::new()),
            slots: config.max_outstanding.map(|max| Arc::new(Semaphore::new(max))),
            factory: Box::new(factory),
            outstanding: Arc::new(AtomicUsize::new(0)),
            created: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            abandoned: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Checks out a freshly reset instance.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Exhausted`] when a bounded pool has every slot
    /// checked out.
    pub fn acquire(&self) -> Result<Pooled<T>, PoolError> {
        let permit = match &self.slots {
            Some(slots) => match Arc::clone(slots).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(TryAcquireError::NoPermits) => {
                    let outstanding = self.outstanding.load(Ordering::Relaxed);
                    warn!(pool_id = self.id, outstanding, "object pool exhausted");
                    return Err(PoolError::exhausted(outstanding));
                }
                Err(TryAcquireError::Closed) => return Err(PoolError::misuse("pool slots are closed")),
            },
            None => None,
        };

        Ok(self.checkout(permit))
    }

    /// Checks out a freshly reset instance, waiting for a free slot when the
    /// pool is bounded.
    ///
    /// # Errors
    ///
    /// Only fails if the slot semaphore was closed, which a pool never does.
    pub async fn acquire_wait(&self) -> Result<Pooled<T>, PoolError> {
        let permit = match &self.slots {
            Some(slots) => Some(Arc::clone(slots).acquire_owned().await.map_err(PoolError::misuse)?),
            None => None,
        };

        Ok(self.checkout(permit))
    }

    /// Gives an instance back for reuse.
    ///
    /// The instance is reset right away so the idle set never pins
    /// per-exchange data. Instances beyond `max_idle` are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Misuse`] when the handle was issued by another
    /// pool. That instance is not adopted and is dropped with its handle.
    pub fn release(&self, handle: Pooled<T>) -> Result<(), PoolError> {
        let Pooled { mut value, mut lease } = handle;

        if lease.pool_id != self.id {
            warn!(pool_id = self.id, owner_pool_id = lease.pool_id, "refuse to adopt an instance from another pool");
            lease.released = true;
            return Err(PoolError::misuse(format!(
                "instance belongs to pool {}, released into pool {}",
                lease.pool_id, self.id
            )));
        }

        lease.released = true;
        value.reset();

        let mut idle = self.lock_idle();
        if idle.len() < self.config.max_idle {
            idle.push(value);
            trace!(pool_id = self.id, idle = idle.len(), "instance returned to pool");
        } else {
            drop(idle);
            trace!(pool_id = self.id, max_idle = self.config.max_idle, "idle set is full, drop released instance");
        }

        Ok(())
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            idle: self.lock_idle().len(),
            outstanding: self.outstanding.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
        }
    }

    fn checkout(&self, permit: Option<OwnedSemaphorePermit>) -> Pooled<T> {
        let idle = self.lock_idle().pop();
        let value = match idle {
            Some(mut value) => {
                value.reset();
                self.reused.fetch_add(1, Ordering::Relaxed);
                trace!(pool_id = self.id, "reuse idle instance");
                value
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                trace!(pool_id = self.id, "create new instance");
                (self.factory)()
            }
        };

        self.outstanding.fetch_add(1, Ordering::Relaxed);
        Pooled {
            value,
            lease: Lease {
                pool_id: self.id,
                outstanding: Arc::clone(&self.outstanding),
                abandoned: Arc::clone(&self.abandoned),
                _permit: permit,
                released: false,
            },
        }
    }

    // idle instances are already reset, a panic elsewhere cannot leave them half-written
    fn lock_idle(&self) -> MutexGuard<'_, Vec<T>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("outstanding", &self.outstanding.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

/// An instance checked out of a [`Pool`].
///
/// Dereferences to the instance. Hand it back with [`Pool::release`].
#[derive(Debug)]
pub struct Pooled<T> {
    value: T,
    lease: Lease,
}

impl<T> Pooled<T> {
    /// Id of the pool that issued this handle.
    pub fn pool_id(&self) -> u64 {
        self.lease.pool_id
    }
}

impl<T> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

#[derive(Debug)]
struct Lease {
    pool_id: u64,
    outstanding: Arc<AtomicUsize>,
    abandoned: Arc<AtomicU64>,
    _permit: Option<OwnedSemaphorePermit>,
    released: bool,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, Ordering::Relaxed);
        if !self.released {
            self.abandoned.fetch_add(1, Ordering::Relaxed);
            warn!(pool_id = self.pool_id, "pooled instance dropped without release");
        }
    }
}
