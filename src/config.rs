pub const MAX_LOCKS: usize = 15;                        // Slots in a lock pool
pub const MAX_PARTICIPANTS: usize = MAX_LOCKS + 1;     // Leaves of the largest tournament tree
