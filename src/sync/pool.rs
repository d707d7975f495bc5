//! Fixed-capacity table of [`PetersonLock`] slots.
//!
//! A slot's `used` flag is the sole arbiter of ownership. Allocation races
//! are settled by an atomic test-and-set on that flag, so two concurrent
//! [`LockPool::create`] calls never hand out the same slot. Once allocated, a
//! slot is protected by the Peterson protocol itself; the pool takes no lock
//! of its own.

use lazy_static::lazy_static;
use spin::relax::RelaxStrategy;

use super::peterson::{LockState, PetersonLock, Role};
use super::DefaultRelax;
use crate::config::MAX_LOCKS;
use crate::error::{LockError, LockResult};

lazy_static! {
    /// The process-wide pool behind the flat `peterson_*` API.
    pub static ref LOCK_POOL: LockPool = LockPool::new();
}

/// Index of an allocated slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockId(usize);

impl LockId {
    #[inline(always)]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl From<LockId> for usize {
    fn from(value: LockId) -> Self {
        value.0
    }
}

impl TryFrom<usize> for LockId {
    type Error = LockError;

    fn try_from(value: usize) -> LockResult<Self> {
        if value < MAX_LOCKS {
            Ok(LockId(value))
        } else {
            Err(LockError::InvalidArgument)
        }
    }
}

pub struct LockPool {
    slots: [PetersonLock; MAX_LOCKS],
}

impl LockPool {
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| PetersonLock::new()),
        }
    }

    /// Resets every slot to free.
    ///
    /// Must not race with any other pool operation.
    pub fn init(&self) {
        for slot in self.slots.iter() {
            slot.clear();
        }
        log::debug!("lock pool reset, {} slots free", MAX_LOCKS);
    }

    /// Claims the first free slot.
    ///
    /// The claimed lock starts with both flags lowered and the turn on
    /// [`Role::Left`].
    pub fn create(&self) -> LockResult<LockId> {
        match self.slots.iter().position(|slot| slot.try_claim()) {
            Some(index) => {
                log::debug!("peterson lock {} created", index);
                Ok(LockId(index))
            }
            None => {
                log::warn!("lock pool exhausted, all {} slots in use", MAX_LOCKS);
                Err(LockError::Exhausted)
            }
        }
    }

    /// Acquires `id` as `role`, yielding with the default relax strategy.
    pub fn acquire(&self, id: LockId, role: Role) -> LockResult<()> {
        self.acquire_with::<DefaultRelax>(id, role)
    }

    /// Acquires `id` as `role`, calling `R::relax()` on every spin.
    pub fn acquire_with<R: RelaxStrategy>(&self, id: LockId, role: Role) -> LockResult<()> {
        log::trace!("acquire lock {} as {:?}", id.0, role);
        self.slot(id)?.acquire::<R>(role)
    }

    pub fn release(&self, id: LockId, role: Role) -> LockResult<()> {
        log::trace!("release lock {} as {:?}", id.0, role);
        self.slot(id)?.release(role)
    }

    /// Returns the slot to the pool.
    ///
    /// Does not check that the lock is idle; the caller guarantees that
    /// neither role holds or awaits it.
    pub fn destroy(&self, id: LockId) -> LockResult<()> {
        self.slot(id)?.retire()?;
        log::debug!("peterson lock {} destroyed", id.0);
        Ok(())
    }

    pub fn state(&self, id: LockId) -> LockResult<LockState> {
        Ok(self.slot(id)?.state())
    }

    /// Number of slots currently allocated.
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_used()).count()
    }

    #[inline]
    fn slot(&self, id: LockId) -> LockResult<&PetersonLock> {
        self.slots.get(id.0).ok_or(LockError::InvalidArgument)
    }
}

impl Default for LockPool {
    fn default() -> Self {
        Self::new()
    }
}
