//! Background preallocation of data files.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::context::Preallocator;

#[derive(Debug, Default)]
struct AllocatorState {
    pending: HashSet<PathBuf>,
    completed: usize,
    failed: usize,
}

/// Creates data files on disk ahead of need, off the caller's thread.
///
/// Each request runs on its own short-lived thread. A request for a path that
/// is already being allocated is dropped. Files that already have at least the
/// requested size are left alone.
#[derive(Debug, Clone, Default)]
pub struct FileAllocator {
    shared: Arc<(Mutex<AllocatorState>, Condvar)>,
}

impl FileAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests still running.
    pub fn pending(&self) -> usize {
        self.shared.0.lock().pending.len()
    }

    /// Number of requests that finished successfully.
    pub fn completed(&self) -> usize {
        self.shared.0.lock().completed
    }

    pub fn failed(&self) -> usize {
        self.shared.0.lock().failed
    }

    /// Block until every running request has finished.
    pub fn wait_idle(&self) {
        let (state, idle) = &*self.shared;
        let mut state = state.lock();
        while !state.pending.is_empty() {
            idle.wait(&mut state);
        }
    }

    fn finish(&self, path: &Path, result: io::Result<()>) {
        let (state, idle) = &*self.shared;
        let mut state = state.lock();
        state.pending.remove(path);
        match result {
            Ok(()) => state.completed += 1,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "preallocation failed");
                state.failed += 1;
            }
        }
        idle.notify_all();
    }
}

fn allocate(path: &Path, size: u64) -> io::Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    if file.metadata()?.len() < size {
        file.set_len(size)?;
        file.sync_all()?;
    }
    Ok(())
}

impl Preallocator for FileAllocator {
    fn request_allocation(&self, path: &Path, size: u64) {
        if !self.shared.0.lock().pending.insert(path.to_path_buf()) {
            return;
        }

        tracing::debug!(path = %path.display(), size, "preallocating data file");

        let worker = self.clone();
        let target = path.to_path_buf();
        let spawned = std::thread::Builder::new()
            .name("file-allocator".into())
            .spawn(move || {
                let result = allocate(&target, size);
                worker.finish(&target, result);
            });

        if let Err(e) = spawned {
            self.finish(path, Err(e));
        }
    }
}
