//! # Lock Module
//!
//! Mutual exclusion built from plain loads, stores and fences.
//!
//! ## Layers
//! - [`peterson`]: Peterson's two-party lock, one role per side
//! - [`pool`]: a fixed table of two-party locks; slots are claimed with a
//!   test-and-set, the only read-modify-write in the module
//! - [`tournament`]: `N - 1` pool locks arranged as a binary tree, giving
//!   mutual exclusion among `N` participants
//!
//! ## Waiting
//! A contender never blocks on a queue. It spins on the lock fields and calls
//! a [`RelaxStrategy`](spin::relax::RelaxStrategy) between reads; with `std`
//! the default strategy yields the thread to the scheduler.
//!
//! ## Usage
//! ```rust
//! use peterson_tournament::sync::pool::LockPool;
//! use peterson_tournament::sync::tournament::TournamentTree;
//!
//! let pool = LockPool::new();
//! let tree: TournamentTree = TournamentTree::create(&pool, 4).unwrap();
//! let me = tree.participant(2).unwrap();
//! {
//!     let _guard = me.lock().unwrap();
//!     // critical section
//! }
//! tree.participant(0).unwrap().destroy().unwrap();
//! ```

pub mod peterson;
pub mod pool;
pub mod tournament;
mod test;

/// Relax strategy used when none is named.
#[cfg(feature = "std")]
pub type DefaultRelax = spin::relax::Yield;

/// Relax strategy used when none is named.
#[cfg(not(feature = "std"))]
pub type DefaultRelax = spin::relax::Spin;
