//! Flat, integer-handle interface to the process-wide [`LOCK_POOL`].
//!
//! Handles and roles are taken as raw integers and validated here, so callers
//! that keep them in plain integer form (or hand them across an FFI boundary)
//! get [`LockError::InvalidArgument`](crate::error::LockError::InvalidArgument)
//! instead of a panic.

use crate::error::LockResult;
use crate::sync::peterson::Role;
use crate::sync::pool::{LockId, LOCK_POOL};

/// Resets every slot of the process-wide pool to free.
///
/// Call once before any other `peterson_*` function, and never while another
/// thread is using the pool.
pub fn peterson_pool_init() {
    LOCK_POOL.init();
}

/// Allocates a lock and returns its handle.
pub fn peterson_create() -> LockResult<usize> {
    LOCK_POOL.create().map(usize::from)
}

pub fn peterson_acquire(handle: usize, role: usize) -> LockResult<()> {
    LOCK_POOL.acquire(LockId::try_from(handle)?, Role::try_from(role)?)
}

pub fn peterson_release(handle: usize, role: usize) -> LockResult<()> {
    LOCK_POOL.release(LockId::try_from(handle)?, Role::try_from(role)?)
}

pub fn peterson_destroy(handle: usize) -> LockResult<()> {
    LOCK_POOL.destroy(LockId::try_from(handle)?)
}
