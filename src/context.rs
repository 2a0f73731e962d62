//! Per-operation context and the process-scoped services it carries.
//!
//! Data files never reach for global state. Everything they need from the
//! rest of the engine (lock state, shutdown state, durability, preallocation)
//! arrives through an [`OperationContext`], so tests can substitute fakes.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::durability::DurableWriteGateway;

/// What the lock manager reports about the current operation.
pub trait LockState {
    /// Whether the operation holds an exclusive write lock (database or wider).
    fn is_write_locked(&self) -> bool;

    /// Human-readable description of the held locks, for diagnostics.
    fn dump(&self) -> String;
}

/// Process shutdown state.
pub trait ShutdownState {
    fn in_shutdown(&self) -> bool;
}

/// Background service that creates files on disk ahead of need.
pub trait Preallocator {
    /// Ask for a file of `size` bytes at `path`. Best effort, returns at once.
    fn request_allocation(&self, path: &Path, size: u64);
}

/// Everything a data file operation needs from its surroundings.
///
/// # Example
/// ```
/// use extentstore::context::{LockMode, Locker, OperationContext, ShutdownFlag};
/// use extentstore::durability::Journal;
/// use extentstore::storage::FileAllocator;
///
/// let locker = Locker::new(LockMode::Exclusive);
/// let shutdown = ShutdownFlag::new();
/// let journal = Journal::new();
/// let allocator = FileAllocator::new();
///
/// let ctx = OperationContext::new(&locker, &shutdown, &journal, &allocator);
/// assert!(ctx.lock_state().is_write_locked());
/// ```
#[derive(Clone, Copy)]
pub struct OperationContext<'a> {
    lock_state: &'a dyn LockState,
    shutdown: &'a dyn ShutdownState,
    durability: &'a dyn DurableWriteGateway,
    preallocator: &'a dyn Preallocator,
}

impl<'a> OperationContext<'a> {
    pub fn new(
        lock_state: &'a dyn LockState,
        shutdown: &'a dyn ShutdownState,
        durability: &'a dyn DurableWriteGateway,
        preallocator: &'a dyn Preallocator,
    ) -> Self {
        Self {
            lock_state,
            shutdown,
            durability,
            preallocator,
        }
    }

    #[inline]
    pub fn lock_state(&self) -> &'a dyn LockState {
        self.lock_state
    }

    #[inline]
    pub fn shutdown(&self) -> &'a dyn ShutdownState {
        self.shutdown
    }

    #[inline]
    pub fn durability(&self) -> &'a dyn DurableWriteGateway {
        self.durability
    }

    #[inline]
    pub fn preallocator(&self) -> &'a dyn Preallocator {
        self.preallocator
    }
}

impl fmt::Debug for OperationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("locks", &self.lock_state.dump())
            .field("in_shutdown", &self.shutdown.in_shutdown())
            .finish()
    }
}

/// Lock mode held by an operation.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    #[default]
    None = 0,
    Shared = 1,
    Exclusive = 2,
}

impl LockMode {
    /// Convert from u8. Unknown values map to [`LockMode::None`].
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => LockMode::Shared,
            2 => LockMode::Exclusive,
            _ => LockMode::None,
        }
    }
}

/// Lock state of one operation, updated by whoever acquires its locks.
#[derive(Debug, Default)]
pub struct Locker {
    mode: AtomicU8,
}

impl Locker {
    pub fn new(mode: LockMode) -> Self {
        Self {
            mode: AtomicU8::new(mode as u8),
        }
    }

    #[inline]
    pub fn mode(&self) -> LockMode {
        LockMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set_mode(&self, mode: LockMode) {
        self.mode.store(mode as u8, Ordering::Release);
    }
}

impl LockState for Locker {
    fn is_write_locked(&self) -> bool {
        self.mode() == LockMode::Exclusive
    }

    fn dump(&self) -> String {
        format!("Locker {{ mode: {:?} }}", self.mode())
    }
}

/// Process-wide shutdown flag.
#[derive(Debug, Default)]
pub struct ShutdownFlag {
    in_shutdown: AtomicBool,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark shutdown as started. There is no way back.
    pub fn begin_shutdown(&self) {
        self.in_shutdown.store(true, Ordering::Release);
    }
}

impl ShutdownState for ShutdownFlag {
    fn in_shutdown(&self) -> bool {
        self.in_shutdown.load(Ordering::Acquire)
    }
}
