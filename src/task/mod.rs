//! Participant spawning.
//!
//! The locks never create execution contexts themselves. A [`Spawner`] runs
//! one body per participant identity, concurrently, and reports back once all
//! of them are done.

use crate::error::LockResult;

#[cfg(feature = "std")]
mod thread;

#[cfg(feature = "std")]
pub use thread::ThreadSpawner;

pub trait Spawner {
    /// Runs `body(identity)` for every identity in `0..count`, each on its
    /// own concurrent context, and returns after all of them have finished.
    ///
    /// Identity 0 runs on the calling context, the one that allocated the
    /// shared locks. On error, contexts that did start have still finished
    /// by the time this returns.
    fn spawn<F>(&self, count: usize, body: F) -> LockResult<()>
    where
        F: Fn(usize) + Sync;
}
