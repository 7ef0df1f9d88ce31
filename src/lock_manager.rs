use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{debug, error};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::errors::{RdfXaError, Result};

/// Identity of a lock holder.
///
/// Every managed connection gets its own holder id from the lock manager it
/// was created with. Locks are granted, counted and released per holder, so a
/// branch that already holds the write lock can still read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HolderId(u64);

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "holder-{}", self.0)
    }
}

/// Mode in which a holder requested the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

#[derive(Debug)]
struct LockRequest {
    holder: HolderId,
    mode: LockMode,
}

/// Read/write lock over the one physical triple-store backend.
///
/// Requests are queued in arrival order. A shared request is granted once no
/// exclusive request of another holder is ahead of it; an exclusive request is
/// granted once no request of another holder is ahead of it. Granted requests
/// stay in the queue until released, so a writer keeps the repository across
/// calls, up to the cleanup of its connection.
///
/// Without a timeout, waiting blocks indefinitely: a writer that never cleans
/// up stalls every other reader and writer.
pub struct LockManager {
    requests: Mutex<VecDeque<LockRequest>>,
    released: Condvar,
    next_holder: AtomicU64,
    timeout: Option<Duration>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    /// Creates a lock manager whose waits never time out.
    pub fn new() -> Self {
        Self::with_timeout(None)
    }

    /// Creates a lock manager whose waits give up after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            requests: Mutex::new(VecDeque::new()),
            released: Condvar::new(),
            next_holder: AtomicU64::new(1),
            timeout,
        }
    }

    /// Hands out a fresh holder id.
    pub fn register_holder(&self) -> HolderId {
        HolderId(self.next_holder.fetch_add(1, Ordering::SeqCst))
    }

    /// Locks the repository for reading on behalf of `holder`.
    ///
    /// Returns immediately if `holder` already holds any lock.
    pub fn lock_to_read(&self, holder: HolderId) -> Result<()> {
        let mut requests = self.requests.lock();
        let created = if requests.iter().any(|r| r.holder == holder) {
            false
        } else {
            requests.push_back(LockRequest {
                holder,
                mode: LockMode::Shared,
            });
            true
        };
        self.wait_until(&mut requests, holder, created, Self::is_free_to_read)
    }

    /// Locks the repository for writing on behalf of `holder`.
    ///
    /// The lock is held until [`LockManager::unlock_all`] is called for the
    /// same holder.
    ///
    /// # Errors
    ///
    /// Returns `RdfXaError::LockUpgrade` if `holder` currently holds the read
    /// lock, and `RdfXaError::LockTimeout` if a timeout is configured and it
    /// elapses first.
    pub fn lock_to_write(&self, holder: HolderId) -> Result<()> {
        let mut requests = self.requests.lock();
        let created = match requests.iter().find(|r| r.holder == holder) {
            Some(existing) if existing.mode == LockMode::Shared => {
                error!("Attempt to lock to write when there is the read lock ({})", holder);
                return Err(RdfXaError::LockUpgrade);
            }
            Some(_) => false,
            None => {
                requests.push_back(LockRequest {
                    holder,
                    mode: LockMode::Exclusive,
                });
                true
            }
        };
        self.wait_until(&mut requests, holder, created, Self::is_free_to_write)
    }

    /// Releases the read lock of `holder`. A write lock is left in place.
    pub fn unlock_from_read(&self, holder: HolderId) {
        let mut requests = self.requests.lock();
        if let Some(pos) = requests
            .iter()
            .position(|r| r.holder == holder && r.mode == LockMode::Shared)
        {
            requests.remove(pos);
            self.released.notify_all();
        }
    }

    /// Releases every lock of `holder`, in any mode.
    pub fn unlock_all(&self, holder: HolderId) {
        let mut requests = self.requests.lock();
        requests.retain(|r| r.holder != holder);
        self.released.notify_all();
    }

    /// Acquires the read lock and returns a guard releasing it on drop.
    pub fn read(&self, holder: HolderId) -> Result<ReadLockGuard<'_>> {
        self.lock_to_read(holder)?;
        Ok(ReadLockGuard {
            manager: self,
            holder,
        })
    }

    /// Number of queued lock requests, granted or waiting, of every holder.
    pub fn held_locks(&self) -> usize {
        self.requests.lock().len()
    }

    /// Mode of the lock `holder` holds or waits for, if any.
    pub fn mode_of(&self, holder: HolderId) -> Option<LockMode> {
        self.requests
            .lock()
            .iter()
            .find(|r| r.holder == holder)
            .map(|r| r.mode)
    }

    fn wait_until(
        &self,
        requests: &mut MutexGuard<'_, VecDeque<LockRequest>>,
        holder: HolderId,
        created: bool,
        is_free: fn(&VecDeque<LockRequest>, HolderId) -> bool,
    ) -> Result<()> {
        let deadline = self.timeout.map(|t| Instant::now() + t);
        while !is_free(requests, holder) {
            match deadline {
                None => self.released.wait(requests),
                Some(deadline) => {
                    if self.released.wait_until(requests, deadline).timed_out()
                        && !is_free(requests, holder)
                    {
                        if created {
                            if let Some(pos) = requests.iter().position(|r| r.holder == holder) {
                                requests.remove(pos);
                            }
                            self.released.notify_all();
                        }
                        debug!("{} gave up waiting for the repository lock", holder);
                        // deadline is only set when timeout is
                        return Err(RdfXaError::LockTimeout(self.timeout.unwrap_or_default()));
                    }
                }
            }
        }
        Ok(())
    }

    // Free to read: no writer of another holder queued before us.
    fn is_free_to_read(requests: &VecDeque<LockRequest>, holder: HolderId) -> bool {
        for request in requests {
            if request.holder == holder {
                return true;
            }
            if request.mode == LockMode::Exclusive {
                return false;
            }
        }
        false
    }

    // Free to write: nobody else queued before us.
    fn is_free_to_write(requests: &VecDeque<LockRequest>, holder: HolderId) -> bool {
        requests
            .iter()
            .next()
            .map(|first| first.holder == holder)
            .unwrap_or(false)
    }
}

/// Scoped shared lock; released when dropped, also on error paths.
pub struct ReadLockGuard<'a> {
    manager: &'a LockManager,
    holder: HolderId,
}

impl Drop for ReadLockGuard<'_> {
    fn drop(&mut self) {
        self.manager.unlock_from_read(self.holder);
    }
}
