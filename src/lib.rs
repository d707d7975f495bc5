//! Peterson Tournament Lock
//!
//! Mutual exclusion for a power-of-two number of participants without a
//! compare-and-swap deciding who enters:
//! - Peterson's two-party lock, built from loads, stores and fences
//! - A fixed pool of such locks, allocated by test-and-set
//! - A tournament tree chaining `N - 1` pool locks so `N` participants
//!   exclude each other
//!
//! # Architectural Overview
//! ```text
//! +----------------------+
//! |  Participants (task) |
//! +----------------------+
//! |   Tournament tree    |
//! +----------------------+
//! |      Lock pool       |
//! +----------------------+
//! |  Peterson two-party  |
//! +----------------------+
//! ```
//!
//! # Features
//! - `std` (default): thread-based [`task::ThreadSpawner`], yielding relax
//!   strategy, the stderr [`logging`] backend. Without it the crate is
//!   `no_std` and needs only `alloc`.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod api;
pub mod config;
pub mod error;
#[cfg(feature = "std")]
pub mod logging;
pub mod sync;
pub mod task;

pub use error::{LockError, LockResult};
pub use sync::peterson::Role;
pub use sync::pool::{LockId, LockPool, LOCK_POOL};
pub use sync::tournament::{Participant, TournamentGuard, TournamentTree};
