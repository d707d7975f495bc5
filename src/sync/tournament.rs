//! Tournament tree of Peterson locks.
//!
//! `N` participants (a power of two) sit at the leaves of a complete binary
//! tree whose `N - 1` internal nodes are two-party locks, numbered breadth
//! first with the root at index 0. A participant climbs from its leaf to the
//! root, winning one two-party lock per level; at each node it meets only the
//! winner of the sibling subtree.
//!
//! ```text
//!                 [0]                level 0
//!           /             \
//!         [1]             [2]        level 1
//!        /   \           /   \
//!      id0   id1       id2   id3     leaves
//! ```
//!
//! For leaf `id` in a tree of `levels` levels, the node on its path at
//! `level` is `(2^level - 1) + (id >> (levels - level))` and the side it
//! plays there is bit `levels - level - 1` of `id`.

use alloc::vec::Vec;
use core::marker::PhantomData;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::relax::RelaxStrategy;

use super::peterson::Role;
use super::pool::{LockId, LockPool};
use super::DefaultRelax;
use crate::config::MAX_PARTICIPANTS;
use crate::error::{LockError, LockResult};
use crate::task::Spawner;

/// Breadth-first index of the node on `identity`'s path at `level`.
///
/// `level` must be below `levels`.
#[inline(always)]
pub(crate) fn node_for_level(levels: usize, identity: usize, level: usize) -> usize {
    // nodes on the levels above = 2^level - 1
    ((1 << level) - 1) + (identity >> (levels - level))
}

/// The side `identity` plays at `level`: left child on a 0 bit, right on a 1.
#[inline(always)]
pub(crate) fn role_for_level(levels: usize, identity: usize, level: usize) -> Role {
    if (identity >> (levels - level - 1)) & 1 == 0 {
        Role::Left
    } else {
        Role::Right
    }
}

/// One node on a participant's root path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    /// Depth of the node, 0 being the root
    pub level: usize,
    /// Breadth-first index of the node
    pub node: usize,
    /// Side the participant plays at this node
    pub role: Role,
}

impl PathStep {
    pub(crate) fn new(levels: usize, identity: usize, level: usize) -> Self {
        Self {
            level,
            node: node_for_level(levels, identity, level),
            role: role_for_level(levels, identity, level),
        }
    }
}

pub struct TournamentTree<'p, R = DefaultRelax> {
    pool: &'p LockPool,
    /// One lock per internal node, breadth-first
    locks: Vec<LockId>,
    participants: usize,
    levels: usize,
    live: AtomicBool,
    _relax: PhantomData<fn() -> R>,
}

impl<'p, R: RelaxStrategy> TournamentTree<'p, R> {
    /// Allocates the `participants - 1` node locks from `pool`.
    ///
    /// # Errors
    /// - [`LockError::InvalidArgument`] if `participants` is zero or not a
    ///   power of two
    /// - [`LockError::Exhausted`] if it is larger than [`MAX_PARTICIPANTS`]
    ///   or the pool runs out of slots; slots claimed so far are given back
    pub fn create(pool: &'p LockPool, participants: usize) -> LockResult<Self> {
        if participants == 0 || !participants.is_power_of_two() {
            log::warn!("tournament of {} participants rejected", participants);
            return Err(LockError::InvalidArgument);
        }
        if participants > MAX_PARTICIPANTS {
            log::warn!(
                "tournament of {} participants exceeds the maximum of {}",
                participants,
                MAX_PARTICIPANTS
            );
            return Err(LockError::Exhausted);
        }

        let levels = participants.trailing_zeros() as usize;

        let mut locks = Vec::with_capacity(participants - 1);
        for _ in 0..participants - 1 {
            match pool.create() {
                Ok(id) => locks.push(id),
                Err(err) => {
                    for &id in locks.iter() {
                        if let Err(err) = pool.destroy(id) {
                            log::error!("failed to give back lock {}: {}", id.index(), err);
                        }
                    }
                    return Err(err);
                }
            }
        }

        log::debug!(
            "tournament created: {} participants, {} levels, locks {:?}",
            participants,
            levels,
            locks
        );

        Ok(Self {
            pool,
            locks,
            participants,
            levels,
            live: AtomicBool::new(true),
            _relax: PhantomData,
        })
    }

    /// Runs a whole tournament: creates the tree, lets `spawner` run `body`
    /// once per identity, then destroys the tree from identity 0 once every
    /// participant has returned.
    ///
    /// The first error returned by any participant is reported after the
    /// tree is gone.
    pub fn compete<S, F>(pool: &'p LockPool, participants: usize, spawner: &S, body: F) -> LockResult<()>
    where
        S: Spawner,
        F: Fn(&Participant<'_, 'p, R>) -> LockResult<()> + Sync,
    {
        let tree = Self::create(pool, participants)?;
        let failure: spin::Mutex<Option<LockError>> = spin::Mutex::new(None);

        let spawned = spawner.spawn(participants, |identity| {
            if let Err(err) = tree.participant(identity).and_then(|participant| body(&participant)) {
                log::error!("participant {} failed: {}", identity, err);
                let mut first = failure.lock();
                if first.is_none() {
                    *first = Some(err);
                }
            }
        });

        // every context has been joined by now, spawned or not
        tree.participant(0)?.destroy()?;
        spawned?;

        match failure.into_inner() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The view of the tree held by `identity`.
    ///
    /// Each identity must be held by exactly one concurrent context.
    pub fn participant(&self, identity: usize) -> LockResult<Participant<'_, 'p, R>> {
        if identity >= self.participants {
            return Err(LockError::InvalidArgument);
        }
        Ok(Participant { tree: self, identity })
    }

    #[inline]
    pub fn participants(&self) -> usize {
        self.participants
    }

    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Node locks in breadth-first order.
    pub fn locks(&self) -> &[LockId] {
        &self.locks
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    #[inline]
    fn lock_at(&self, node: usize) -> LockResult<LockId> {
        self.locks.get(node).copied().ok_or(LockError::InvalidArgument)
    }
}

impl<R> Drop for TournamentTree<'_, R> {
    fn drop(&mut self) {
        if !*self.live.get_mut() {
            return;
        }
        log::debug!("tournament dropped without destroy, giving back {} locks", self.locks.len());
        for &id in self.locks.iter() {
            if let Err(err) = self.pool.destroy(id) {
                log::error!("failed to give back lock {}: {}", id.index(), err);
            }
        }
    }
}

/// A participant's handle on a [`TournamentTree`].
pub struct Participant<'t, 'p, R = DefaultRelax> {
    tree: &'t TournamentTree<'p, R>,
    identity: usize,
}

impl<R> Clone for Participant<'_, '_, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Participant<'_, '_, R> {}

impl<'t, 'p, R: RelaxStrategy> Participant<'t, 'p, R> {
    #[inline]
    pub fn identity(&self) -> usize {
        self.identity
    }

    /// Nodes on this participant's path, leaf side first.
    pub fn path(&self) -> impl Iterator<Item = PathStep> {
        let (levels, identity) = (self.tree.levels, self.identity);
        (0..levels).rev().map(move |level| PathStep::new(levels, identity, level))
    }

    #[inline]
    fn step(&self, level: usize) -> PathStep {
        PathStep::new(self.tree.levels, self.identity, level)
    }

    /// Climbs from the leaf to the root, winning each node on the way.
    ///
    /// A failure at any level returns at once; locks already won lower down
    /// in this call stay held.
    pub fn acquire(&self) -> LockResult<()> {
        if !self.tree.is_live() {
            return Err(LockError::InvalidState);
        }

        for level in (0..self.tree.levels).rev() {
            let step = self.step(level);
            let id = self.tree.lock_at(step.node)?;
            if let Err(err) = self.tree.pool.acquire_with::<R>(id, step.role) {
                log::warn!(
                    "participant {} failed at level {} (node {}): {}",
                    self.identity,
                    level,
                    step.node,
                    err
                );
                return Err(err);
            }
        }

        log::trace!("participant {} won the tournament", self.identity);
        Ok(())
    }

    /// Gives the path back root first, so the node gating the whole tree is
    /// free as early as possible.
    pub fn release(&self) -> LockResult<()> {
        if !self.tree.is_live() {
            return Err(LockError::InvalidState);
        }

        for level in 0..self.tree.levels {
            let step = self.step(level);
            let id = self.tree.lock_at(step.node)?;
            self.tree.pool.release(id, step.role)?;
        }

        log::trace!("participant {} left the critical section", self.identity);
        Ok(())
    }

    /// Acquires and returns a guard that releases on drop.
    pub fn lock(&self) -> LockResult<TournamentGuard<'t, 'p, R>> {
        self.acquire()?;
        Ok(TournamentGuard { participant: *self })
    }

    /// Frees every node lock. Identity 0 only.
    ///
    /// The caller guarantees that every other participant has made its last
    /// release and will not acquire again.
    ///
    /// Every lock is given back even if some fail; the first failure is
    /// returned afterwards.
    pub fn destroy(&self) -> LockResult<()> {
        if self.identity != 0 {
            log::warn!("participant {} may not destroy the tournament", self.identity);
            return Err(LockError::InvalidState);
        }
        if !self.tree.is_live() {
            return Err(LockError::InvalidState);
        }
        self.tree.live.store(false, Ordering::Release);

        let mut failure = None;
        for &id in self.tree.locks.iter() {
            if let Err(err) = self.tree.pool.destroy(id) {
                log::error!("failed to give back lock {}: {}", id.index(), err);
                if failure.is_none() {
                    failure = Some(err);
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => {
                log::debug!("tournament of {} participants destroyed", self.tree.participants);
                Ok(())
            }
        }
    }
}

/// Holds the tournament won; releases it when dropped.
pub struct TournamentGuard<'t, 'p, R: RelaxStrategy = DefaultRelax> {
    participant: Participant<'t, 'p, R>,
}

impl<R: RelaxStrategy> TournamentGuard<'_, '_, R> {
    pub fn identity(&self) -> usize {
        self.participant.identity
    }
}

impl<R: RelaxStrategy> Drop for TournamentGuard<'_, '_, R> {
    fn drop(&mut self) {
        if let Err(err) = self.participant.release() {
            log::error!("participant {} failed to release: {}", self.participant.identity, err);
        }
    }
}
