#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use spin::relax::Spin;
use strum::IntoEnumIterator;

use super::peterson::Role;
use super::pool::{LockId, LockPool};
use super::tournament::{node_for_level, role_for_level, PathStep, TournamentTree};
use crate::config::{MAX_LOCKS, MAX_PARTICIPANTS};
use crate::error::LockError;

#[test]
fn roles_are_each_others_opposite() {
    for role in Role::iter() {
        assert_ne!(role, role.other());
        assert_eq!(role, role.other().other());
    }
    assert_eq!(Role::try_from(0), Ok(Role::Left));
    assert_eq!(Role::try_from(1), Ok(Role::Right));
    assert_eq!(Role::try_from(2), Err(LockError::InvalidArgument));
}

#[test]
fn created_lock_starts_fresh() {
    let pool = LockPool::new();
    let id = pool.create().unwrap();
    let state = pool.state(id).unwrap();
    assert!(state.used);
    assert_eq!(state.flag, [false, false]);
    assert_eq!(state.turn, Role::Left);
}

#[test]
fn acquire_raises_flag_and_gives_turn_away() {
    let pool = LockPool::new();
    let id = pool.create().unwrap();

    pool.acquire(id, Role::Left).unwrap();
    let state = pool.state(id).unwrap();
    assert_eq!(state.flag, [true, false]);
    assert_eq!(state.turn, Role::Right);

    pool.release(id, Role::Left).unwrap();
    assert_eq!(pool.state(id).unwrap().flag, [false, false]);
}

#[test]
fn uncontended_roles_take_turns() {
    let pool = LockPool::new();
    let id = pool.create().unwrap();
    for _ in 0..10 {
        pool.acquire(id, Role::Left).unwrap();
        pool.release(id, Role::Left).unwrap();
        pool.acquire(id, Role::Right).unwrap();
        pool.release(id, Role::Right).unwrap();
    }
}

#[test]
fn destroyed_slot_is_reused_fresh() {
    let pool = LockPool::new();
    let id = pool.create().unwrap();
    pool.acquire(id, Role::Right).unwrap();
    pool.destroy(id).unwrap();

    let reused = pool.create().unwrap();
    assert_eq!(reused, id);
    let state = pool.state(reused).unwrap();
    assert_eq!(state.flag, [false, false]);
    assert_eq!(state.turn, Role::Left);
}

#[test]
fn pool_runs_out_of_slots() {
    let pool = LockPool::new();
    let ids: Vec<LockId> = (0..MAX_LOCKS).map(|_| pool.create().unwrap()).collect();
    assert_eq!(pool.in_use(), MAX_LOCKS);
    assert_eq!(pool.create(), Err(LockError::Exhausted));

    pool.destroy(ids[7]).unwrap();
    assert_eq!(pool.create(), Ok(ids[7]));
}

#[test]
fn init_frees_every_slot() {
    let pool = LockPool::new();
    for _ in 0..4 {
        pool.create().unwrap();
    }
    pool.init();
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn unused_slot_is_rejected() {
    let pool = LockPool::new();
    let id = pool.create().unwrap();
    pool.destroy(id).unwrap();

    assert_eq!(pool.acquire(id, Role::Left), Err(LockError::InvalidArgument));
    assert_eq!(pool.release(id, Role::Left), Err(LockError::InvalidArgument));
    assert_eq!(pool.destroy(id), Err(LockError::InvalidState));
}

#[test]
fn out_of_range_handle_is_rejected() {
    assert_eq!(LockId::try_from(MAX_LOCKS), Err(LockError::InvalidArgument));
    assert_eq!(LockId::try_from(MAX_LOCKS - 1).map(usize::from), Ok(MAX_LOCKS - 1));
}

#[test]
fn concurrent_creates_never_share_a_slot() {
    let pool = LockPool::new();
    let claimed: Vec<Vec<LockId>> = thread::scope(|scope| {
        let workers: Vec<_> = (0..3)
            .map(|_| scope.spawn(|| (0..5).map(|_| pool.create().unwrap()).collect::<Vec<_>>()))
            .collect();
        workers.into_iter().map(|worker| worker.join().unwrap()).collect()
    });

    let mut all: Vec<usize> = claimed.into_iter().flatten().map(usize::from).collect();
    all.sort_unstable();
    assert_eq!(all, (0..MAX_LOCKS).collect::<Vec<_>>());
}

#[test]
fn a_waiting_role_is_overtaken_at_most_once() {
    let pool = LockPool::new();
    let id = pool.create().unwrap();
    let entries = AtomicUsize::new(0);
    let left_entry = AtomicUsize::new(usize::MAX);

    pool.acquire(id, Role::Right).unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            pool.acquire(id, Role::Left).unwrap();
            left_entry.store(entries.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
            pool.release(id, Role::Left).unwrap();
        });

        // wait until the left role has given the turn away and is spinning
        loop {
            let state = pool.state(id).unwrap();
            if state.flag[Role::Left.index()] && state.turn == Role::Right {
                break;
            }
            thread::yield_now();
        }

        pool.release(id, Role::Right).unwrap();
        pool.acquire(id, Role::Right).unwrap();
        let right_entry = entries.fetch_add(1, Ordering::SeqCst);
        pool.release(id, Role::Right).unwrap();

        assert!(left_entry.load(Ordering::SeqCst) < right_entry);
    });
}

#[test]
fn path_of_four_participants() {
    let pool = LockPool::new();
    let tree: TournamentTree = TournamentTree::create(&pool, 4).unwrap();
    assert_eq!(tree.levels(), 2);

    let path: Vec<PathStep> = tree.participant(3).unwrap().path().collect();
    assert_eq!(
        path,
        vec![
            PathStep { level: 1, node: 2, role: Role::Right },
            PathStep { level: 0, node: 0, role: Role::Right },
        ]
    );

    let path: Vec<PathStep> = tree.participant(0).unwrap().path().collect();
    assert_eq!(
        path,
        vec![
            PathStep { level: 1, node: 1, role: Role::Left },
            PathStep { level: 0, node: 0, role: Role::Left },
        ]
    );
}

#[test]
fn siblings_meet_at_their_parent() {
    let levels = 4;
    for identity in (0..16).step_by(2) {
        let sibling = identity + 1;
        let level = levels - 1;
        assert_eq!(
            node_for_level(levels, identity, level),
            node_for_level(levels, sibling, level)
        );
        assert_eq!(role_for_level(levels, identity, level), Role::Left);
        assert_eq!(role_for_level(levels, sibling, level), Role::Right);
    }
    // every leaf reaches the root, and the halves split there
    for identity in 0..16 {
        assert_eq!(node_for_level(levels, identity, 0), 0);
        let expected = if identity < 8 { Role::Left } else { Role::Right };
        assert_eq!(role_for_level(levels, identity, 0), expected);
    }
}

#[test]
fn deepest_nodes_cover_the_last_level() {
    let levels = 3;
    let mut nodes: Vec<usize> = (0..8).map(|id| node_for_level(levels, id, levels - 1)).collect();
    nodes.dedup();
    assert_eq!(nodes, vec![3, 4, 5, 6]);
}

#[test]
fn participant_counts_are_validated() {
    let pool = LockPool::new();
    for count in [0, 3, 6, 17] {
        assert_eq!(
            TournamentTree::<Spin>::create(&pool, count).err(),
            Some(LockError::InvalidArgument)
        );
    }
    assert_eq!(
        TournamentTree::<Spin>::create(&pool, MAX_PARTICIPANTS * 2).err(),
        Some(LockError::Exhausted)
    );
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn tree_takes_one_lock_per_internal_node() {
    let pool = LockPool::new();
    for count in [1, 2, 4, 8, 16] {
        let tree = TournamentTree::<Spin>::create(&pool, count).unwrap();
        assert_eq!(tree.locks().len(), count - 1);
        assert_eq!(pool.in_use(), count - 1);
        tree.participant(0).unwrap().destroy().unwrap();
        assert_eq!(pool.in_use(), 0);
    }
}

#[test]
fn failed_create_gives_slots_back() {
    let pool = LockPool::new();
    let held: Vec<LockId> = (0..10).map(|_| pool.create().unwrap()).collect();

    assert_eq!(
        TournamentTree::<Spin>::create(&pool, 8).err(),
        Some(LockError::Exhausted)
    );
    assert_eq!(pool.in_use(), held.len());
}

#[test]
fn single_participant_needs_no_lock() {
    let pool = LockPool::new();
    let tree = TournamentTree::<Spin>::create(&pool, 1).unwrap();
    let me = tree.participant(0).unwrap();
    assert_eq!(me.path().count(), 0);
    me.acquire().unwrap();
    me.release().unwrap();
    me.destroy().unwrap();
}

#[test]
fn unknown_identity_is_rejected() {
    let pool = LockPool::new();
    let tree = TournamentTree::<Spin>::create(&pool, 4).unwrap();
    assert!(matches!(tree.participant(4), Err(LockError::InvalidArgument)));
}

#[test]
fn only_identity_zero_destroys_once() {
    let pool = LockPool::new();
    let tree = TournamentTree::<Spin>::create(&pool, 4).unwrap();

    assert_eq!(tree.participant(2).unwrap().destroy(), Err(LockError::InvalidState));
    assert!(tree.is_live());

    let owner = tree.participant(0).unwrap();
    owner.destroy().unwrap();
    assert_eq!(owner.destroy(), Err(LockError::InvalidState));
    assert_eq!(pool.in_use(), 0);

    let late = tree.participant(1).unwrap();
    assert_eq!(late.acquire(), Err(LockError::InvalidState));
    assert_eq!(late.release(), Err(LockError::InvalidState));
}

#[test]
fn destroy_gives_back_every_lock_past_a_stale_one() {
    let pool = LockPool::new();
    let tree = TournamentTree::<Spin>::create(&pool, 4).unwrap();

    // node 1 freed behind the tree's back
    pool.destroy(tree.locks()[1]).unwrap();
    assert_eq!(pool.in_use(), 2);

    assert_eq!(tree.participant(0).unwrap().destroy(), Err(LockError::InvalidState));
    assert!(!tree.is_live());
    assert_eq!(pool.in_use(), 0);

    drop(tree);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn failed_climb_keeps_lower_levels_held() {
    let pool = LockPool::new();
    let tree = TournamentTree::<Spin>::create(&pool, 4).unwrap();
    let root = tree.locks()[0];
    let below = tree.locks()[2];

    pool.destroy(root).unwrap();

    // identity 3 wins node 2 as the right child, then finds the root gone
    assert_eq!(tree.participant(3).unwrap().acquire(), Err(LockError::InvalidArgument));
    let state = pool.state(below).unwrap();
    assert!(state.used);
    assert_eq!(state.flag, [false, true]);
    assert_eq!(state.turn, Role::Left);

    drop(tree);
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn dropping_a_live_tree_gives_locks_back() {
    let pool = LockPool::new();
    {
        let _tree = TournamentTree::<Spin>::create(&pool, 8).unwrap();
        assert_eq!(pool.in_use(), 7);
    }
    assert_eq!(pool.in_use(), 0);
}

#[test]
fn guard_holds_the_whole_path() {
    let pool = LockPool::new();
    let tree = TournamentTree::<Spin>::create(&pool, 4).unwrap();
    let me = tree.participant(1).unwrap();

    {
        let guard = me.lock().unwrap();
        assert_eq!(guard.identity(), 1);
        for step in me.path() {
            let state = pool.state(tree.locks()[step.node]).unwrap();
            assert!(state.flag[step.role.index()]);
        }
    }

    for step in me.path() {
        let state = pool.state(tree.locks()[step.node]).unwrap();
        assert!(!state.flag[step.role.index()]);
    }
}
