use std::thread;

use super::Spawner;
use crate::error::{LockError, LockResult};

/// Runs each participant on a scoped OS thread named `participant-<id>`.
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner {
    stack_size: Option<usize>,
}

impl ThreadSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }
}

impl Spawner for ThreadSpawner {
    fn spawn<F>(&self, count: usize, body: F) -> LockResult<()>
    where
        F: Fn(usize) + Sync,
    {
        if count == 0 {
            return Ok(());
        }
        let body = &body;

        thread::scope(|scope| {
            for identity in 1..count {
                let mut builder = thread::Builder::new().name(format!("participant-{}", identity));
                if let Some(size) = self.stack_size {
                    builder = builder.stack_size(size);
                }
                if let Err(err) = builder.spawn_scoped(scope, move || body(identity)) {
                    log::error!("failed to spawn participant {}: {}", identity, err);
                    return Err(LockError::Exhausted);
                }
            }

            body(0);
            Ok(())
        })
    }
}
