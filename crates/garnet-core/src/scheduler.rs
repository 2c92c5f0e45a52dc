//! Language threads
//!
//! Every language-level thread runs on its own native thread with a fresh
//! [`Interpreter`]: its own operand stack and call frames, but the same
//! heap, class registry and scheduler as the spawner. Spawning never blocks
//! and the spawner never waits implicitly; coordination goes through
//! channels, or through [`Scheduler::join`] for embedders.
//!
//! The registry only tracks threads that may still need attention. A thread
//! that completes cleanly is forgotten as soon as it exits and its native
//! thread is detached. A failed thread keeps its entry so the failure can be
//! read back, until it is joined.

use crate::value::Value;
use crate::vm::{Interpreter, VmShared};
use crate::{VmError, VmResult};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Unique identifier for a language thread
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(u64);

impl ThreadId {
    /// The thread running the top-level program
    pub const MAIN: ThreadId = ThreadId(0);

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Create a ThreadId from a u64 value
    pub fn from_u64(id: u64) -> Self {
        ThreadId(id)
    }
}

/// State of a language thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadState {
    /// Body still executing (or blocked on a channel)
    Running,
    /// Body returned normally
    Completed,
    /// An error escaped the body; holds its message
    Failed(String),
}

/// Opaque handle to a spawned thread
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ThreadHandle {
    id: ThreadId,
}

impl ThreadHandle {
    /// Thread identifier
    pub fn id(&self) -> ThreadId {
        self.id
    }
}

struct ThreadEntry {
    state: ThreadState,
    join: Option<JoinHandle<()>>,
}

/// Registry of spawned threads
pub struct Scheduler {
    next_id: AtomicU64,
    threads: DashMap<ThreadId, ThreadEntry>,
    name_prefix: String,
    stack_size: usize,
}

impl Scheduler {
    /// Create a scheduler whose threads are named `<prefix>-<id>`
    pub fn new(name_prefix: String, stack_size: usize) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            threads: DashMap::new(),
            name_prefix,
            stack_size,
        }
    }

    /// Run `block` on a new native thread
    pub(crate) fn spawn(&self, shared: Arc<VmShared>, block: Value) -> VmResult<ThreadHandle> {
        let id = ThreadId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.threads.insert(
            id,
            ThreadEntry {
                state: ThreadState::Running,
                join: None,
            },
        );

        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.name_prefix, id.as_u64()))
            .stack_size(self.stack_size)
            .spawn(move || run_thread(shared, id, block));

        match spawned {
            Ok(join) => {
                if let Some(mut entry) = self.threads.get_mut(&id) {
                    entry.join = Some(join);
                }
                log::debug!("spawned thread {}", id.as_u64());
                Ok(ThreadHandle { id })
            }
            Err(err) => {
                self.threads.remove(&id);
                Err(VmError::ThreadSpawn(err))
            }
        }
    }

    fn finish(&self, id: ThreadId, state: ThreadState) {
        if state == ThreadState::Completed {
            self.threads.remove(&id);
            return;
        }
        if let Some(mut entry) = self.threads.get_mut(&id) {
            entry.state = state;
            // Detach: nothing is left to wait for once the state is final
            entry.join = None;
        }
    }

    fn issued(&self, id: ThreadId) -> bool {
        id.as_u64() > 0 && id.as_u64() < self.next_id.load(Ordering::Relaxed)
    }

    /// Current state of a thread
    ///
    /// A thread that is no longer tracked has either completed cleanly or
    /// already been joined.
    pub fn state(&self, handle: ThreadHandle) -> Option<ThreadState> {
        match self.threads.get(&handle.id) {
            Some(entry) => Some(entry.state.clone()),
            None if self.issued(handle.id) => Some(ThreadState::Completed),
            None => None,
        }
    }

    /// Handle for a thread id this scheduler has issued
    pub fn handle(&self, id: ThreadId) -> Option<ThreadHandle> {
        self.issued(id).then_some(ThreadHandle { id })
    }

    /// Wait for a thread to finish, return its final state and forget it
    pub fn join(&self, handle: ThreadHandle) -> VmResult<ThreadState> {
        // The map guard must be released before joining: the thread updates
        // its own entry on exit.
        let join = self
            .threads
            .get_mut(&handle.id)
            .and_then(|mut entry| entry.join.take());

        if let Some(join) = join {
            join.join()
                .map_err(|_| VmError::ThreadPanicked(handle.id.as_u64()))?;
        }

        let state = self
            .state(handle)
            .ok_or_else(|| VmError::InvalidBytecode(format!("unknown thread {}", handle.id.as_u64())))?;
        self.threads.remove(&handle.id);
        Ok(state)
    }

    /// Join every tracked thread, leaving the registry empty
    pub fn join_all(&self) -> VmResult<()> {
        let mut ids: Vec<ThreadId> = self.threads.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        for id in ids {
            self.join(ThreadHandle { id })?;
        }
        Ok(())
    }

    /// Number of threads still running
    pub fn active_threads(&self) -> usize {
        self.threads
            .iter()
            .filter(|entry| entry.state == ThreadState::Running)
            .count()
    }

    /// Number of threads still tracked: running, or failed and not yet joined
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}

fn run_thread(shared: Arc<VmShared>, id: ThreadId, block: Value) {
    let mut interpreter = Interpreter::new(shared.clone(), id);
    let state = match interpreter.call_block(&block, Vec::new()) {
        Ok(_) => ThreadState::Completed,
        Err(err) => {
            let message = err.to_string();
            log::warn!("thread {} failed: {}", id.as_u64(), message);
            ThreadState::Failed(message)
        }
    };
    log::debug!("thread {} finished", id.as_u64());
    shared.scheduler.finish(id, state);
}
