//! Peterson's two-party lock.
//!
//! Two roles exclude each other with nothing but loads, stores and explicit
//! fences: each role announces its intent in `flag`, then hands the tie-break
//! to the other role through `turn`. Whoever wrote `turn` last waits.
//!
//! The only read-modify-write on a [`PetersonLock`] is the test-and-set on
//! `used`, and it only decides who owns the slot, never who enters.

use core::sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering};

use spin::relax::RelaxStrategy;
use strum::{EnumIter, FromRepr};

use crate::error::{LockError, LockResult};

/// Side of a two-party lock a caller plays.
///
/// In a tournament tree this is the child the caller comes from: `Left` for
/// the left subtree, `Right` for the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, EnumIter)]
#[repr(usize)]
pub enum Role {
    Left = 0,
    Right = 1,
}

impl Role {
    #[inline(always)]
    pub fn other(self) -> Role {
        match self {
            Role::Left => Role::Right,
            Role::Right => Role::Left,
        }
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for Role {
    type Error = LockError;

    fn try_from(value: usize) -> LockResult<Self> {
        Role::from_repr(value).ok_or(LockError::InvalidArgument)
    }
}

/// One slot of a [`LockPool`](super::pool::LockPool).
pub struct PetersonLock {
    /// Slot occupancy, claimed by test-and-set
    used: AtomicBool,
    /// Per-role intent to enter
    flag: [AtomicBool; 2],
    /// The role that yields when both intend to enter
    turn: AtomicUsize,
}

/// Point-in-time view of a [`PetersonLock`].
///
/// Taken without synchronizing with the lock's users, so it is only exact
/// when nobody is contending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockState {
    pub used: bool,
    pub flag: [bool; 2],
    pub turn: Role,
}

impl PetersonLock {
    pub const fn new() -> Self {
        Self {
            used: AtomicBool::new(false),
            flag: [AtomicBool::new(false), AtomicBool::new(false)],
            turn: AtomicUsize::new(Role::Left as usize),
        }
    }

    /// Claims the slot if it is free and resets its protocol fields.
    ///
    /// Returns `false` when somebody else owns the slot.
    pub(crate) fn try_claim(&self) -> bool {
        if self.used.swap(true, Ordering::Acquire) {
            return false;
        }
        fence(Ordering::SeqCst);
        self.reset();
        true
    }

    /// Frees the slot unconditionally.
    pub(crate) fn clear(&self) {
        self.reset();
        fence(Ordering::SeqCst);
        self.used.store(false, Ordering::Release);
    }

    fn reset(&self) {
        self.flag[Role::Left.index()].store(false, Ordering::Relaxed);
        self.flag[Role::Right.index()].store(false, Ordering::Relaxed);
        self.turn.store(Role::Left.index(), Ordering::Relaxed);
    }

    #[inline]
    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Acquire)
    }

    /// Enters the critical section as `role`, relaxing with `R` while the
    /// other role holds priority.
    ///
    /// # Behavior
    /// 1. Raise our flag, then fence so the flag is visible before `turn`
    /// 2. Give the turn away, then fence so `turn` is visible before we test
    /// 3. Spin while the other role wants in and still has the turn; both
    ///    fields are re-read on every iteration
    pub(crate) fn acquire<R: RelaxStrategy>(&self, role: Role) -> LockResult<()> {
        if !self.is_used() {
            return Err(LockError::InvalidArgument);
        }

        let me = role.index();
        let other = role.other().index();

        self.flag[me].store(true, Ordering::Relaxed);
        fence(Ordering::SeqCst);
        self.turn.store(other, Ordering::Relaxed);
        fence(Ordering::SeqCst);

        while self.flag[other].load(Ordering::Acquire) && self.turn.load(Ordering::Acquire) == other {
            R::relax();
        }

        Ok(())
    }

    /// Leaves the critical section held as `role`.
    ///
    /// No fence follows the store: the next acquirer fences before it tests.
    pub(crate) fn release(&self, role: Role) -> LockResult<()> {
        if !self.is_used() {
            return Err(LockError::InvalidArgument);
        }

        fence(Ordering::SeqCst);
        self.flag[role.index()].store(false, Ordering::Release);

        Ok(())
    }

    /// Gives the slot back. The caller guarantees that neither role is inside
    /// or contending.
    pub(crate) fn retire(&self) -> LockResult<()> {
        if !self.is_used() {
            return Err(LockError::InvalidState);
        }

        fence(Ordering::SeqCst);
        self.used.store(false, Ordering::Release);

        Ok(())
    }

    pub fn state(&self) -> LockState {
        let turn = Role::from_repr(self.turn.load(Ordering::Acquire)).unwrap_or(Role::Left);
        LockState {
            used: self.used.load(Ordering::Acquire),
            flag: [
                self.flag[Role::Left.index()].load(Ordering::Acquire),
                self.flag[Role::Right.index()].load(Ordering::Acquire),
            ],
            turn,
        }
    }
}

impl Default for PetersonLock {
    fn default() -> Self {
        Self::new()
    }
}
