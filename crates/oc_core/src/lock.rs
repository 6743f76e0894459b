//! Single-scorer edit lock with idle expiry.
//!
//! One editor holds the lock per match; mutating calls present the holder id
//! that acquired it. The holder renews periodically while scoring, and a lock
//! idle past its expiry window can be taken over by another editor, which
//! covers the scorer who walked away mid-match.
//!
//! Locks are runtime state, never persisted: a process restart starts
//! unlocked.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Result, ScoreError};

/// A granted lock. The holder id is the caller's proof of ownership; the
/// holder name is only for display and conflict messages.
#[derive(Debug, Clone)]
pub struct EditLock {
    pub match_id: Uuid,
    pub holder_id: Uuid,
    pub holder_name: String,
    /// Wall-clock acquisition time, for display.
    pub acquired_at: DateTime<Utc>,
    deadline: Instant,
}

impl EditLock {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Hands out and checks [`EditLock`]s for one match.
///
/// The `*_at` variants take an explicit clock reading so expiry behavior is
/// testable without sleeping; the plain forms use `Instant::now()`.
#[derive(Debug)]
pub struct EditLockCoordinator {
    match_id: Uuid,
    expiry_window: Duration,
    lock: Option<EditLock>,
}

impl EditLockCoordinator {
    pub fn new(match_id: Uuid, expiry_window: Duration) -> Self {
        EditLockCoordinator {
            match_id,
            expiry_window,
            lock: None,
        }
    }

    /// The current lock, expired or not.
    pub fn holder(&self) -> Option<&EditLock> {
        self.lock.as_ref()
    }

    /// Take the lock. Re-acquiring as the current holder renews instead of
    /// conflicting; a live lock held by anyone else is a `LockConflict`, and
    /// an expired one is taken over.
    pub fn acquire(&mut self, holder_id: Uuid, holder_name: &str) -> Result<EditLock> {
        self.acquire_at(holder_id, holder_name, Instant::now())
    }

    pub fn acquire_at(
        &mut self,
        holder_id: Uuid,
        holder_name: &str,
        now: Instant,
    ) -> Result<EditLock> {
        if let Some(lock) = self.lock.as_mut() {
            if lock.holder_id == holder_id {
                lock.deadline = now + self.expiry_window;
                return Ok(lock.clone());
            }
            if !lock.is_expired_at(now) {
                return Err(ScoreError::LockConflict {
                    holder_name: lock.holder_name.clone(),
                });
            }
            log::warn!(
                "edit lock held by {} expired; {} takes over",
                lock.holder_name,
                holder_name
            );
        }

        let lock = EditLock {
            match_id: self.match_id,
            holder_id,
            holder_name: holder_name.to_string(),
            acquired_at: Utc::now(),
            deadline: now + self.expiry_window,
        };
        self.lock = Some(lock.clone());
        log::info!("edit lock acquired by {holder_name}");
        Ok(lock)
    }

    /// Check that `holder_id` holds the live lock.
    pub fn verify(&self, holder_id: Uuid) -> Result<()> {
        self.verify_at(holder_id, Instant::now())
    }

    pub fn verify_at(&self, holder_id: Uuid, now: Instant) -> Result<()> {
        match &self.lock {
            None => Err(ScoreError::StateConflict(
                "no active edit lock; acquire one first".to_string(),
            )),
            Some(lock) if lock.holder_id != holder_id => Err(ScoreError::LockConflict {
                holder_name: lock.holder_name.clone(),
            }),
            Some(lock) if lock.is_expired_at(now) => Err(ScoreError::StateConflict(
                "edit lock expired; acquire it again".to_string(),
            )),
            Some(_) => Ok(()),
        }
    }

    /// Verify and slide the expiry window forward. The holder calls this
    /// periodically while scoring, so the lock only expires through
    /// inactivity. A failed renewal is not retried here; the caller
    /// re-acquires.
    pub fn renew(&mut self, holder_id: Uuid) -> Result<()> {
        self.renew_at(holder_id, Instant::now())
    }

    pub fn renew_at(&mut self, holder_id: Uuid, now: Instant) -> Result<()> {
        self.verify_at(holder_id, now)?;
        if let Some(lock) = self.lock.as_mut() {
            lock.deadline = now + self.expiry_window;
        }
        Ok(())
    }

    /// Give the lock up. Releasing when no lock is held is a no-op; an
    /// expired lock can still be released by its own holder.
    pub fn release(&mut self, holder_id: Uuid) -> Result<()> {
        match &self.lock {
            None => Ok(()),
            Some(lock) if lock.holder_id != holder_id => Err(ScoreError::LockConflict {
                holder_name: lock.holder_name.clone(),
            }),
            Some(lock) => {
                log::info!("edit lock released by {}", lock.holder_name);
                self.lock = None;
                Ok(())
            }
        }
    }
}
