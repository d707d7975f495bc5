//! Error codes shared by the lock pool and the tournament tree.
//!
//! Every failure is reported synchronously to the immediate caller. The
//! discriminants follow the Unix errno numbering so a failure can be handed to
//! C-style callers as a negative return value.

use strum_macros::{Display, FromRepr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, FromRepr)]
#[repr(i32)]
pub enum LockError {
    /// Out-of-range handle, role outside {0, 1}, bad participant count or
    /// identity, or a lock slot that is not in use.
    #[strum(serialize = "Invalid argument")]
    InvalidArgument = 22,
    /// No free pool slot, or more participants than the pool can serve.
    #[strum(serialize = "Resource exhausted")]
    Exhausted = 11,
    /// Destroy by a participant other than identity 0, or on something that
    /// is already gone.
    #[strum(serialize = "Operation not permitted in current state")]
    InvalidState = 1,
}

pub type LockResult<T> = Result<T, LockError>;

impl LockError {
    /// The value a C-style caller would see: the negated errno.
    pub fn as_return_code(self) -> i32 {
        -(self as i32)
    }
}

impl TryFrom<i32> for LockError {
    type Error = ();

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        value
            .checked_abs()
            .and_then(LockError::from_repr)
            .ok_or(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LockError {}
