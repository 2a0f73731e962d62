//! extentstore - memory-mapped data files with a durable header and a bump
//! extent allocator.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Caller (extent manager)                     │
//! │             holds the database write lock, owns files           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                OperationContext (context/)               │   │
//! │  │    LockState + ShutdownState + Durability + Preallocator │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                  DataFile (storage/)                     │   │
//! │  │     SizePolicy → MappedFile → header init / upgrade      │   │
//! │  │              alloc_extent_area → DiskLoc                 │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │               Durability (durability/)                   │   │
//! │  │   WriteUnitOfWork → DurableWriteGateway (Journal)        │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (DiskLoc, Error, config)
//! - [`context`] - Per-operation context and its services
//! - [`durability`] - Durable writes, units of work, the journal
//! - [`storage`] - Data files, headers, mapping, sizing
//!
//! # Quick Start
//! ```no_run
//! use std::path::Path;
//! use extentstore::context::{LockMode, Locker, OperationContext, ShutdownFlag};
//! use extentstore::durability::Journal;
//! use extentstore::storage::{DataFile, FileAllocator};
//! use extentstore::StorageOptions;
//!
//! let locker = Locker::new(LockMode::Exclusive);
//! let shutdown = ShutdownFlag::new();
//! let journal = Journal::new();
//! let allocator = FileAllocator::new();
//! let ctx = OperationContext::new(&locker, &shutdown, &journal, &allocator);
//!
//! // Create data file 0 and carve an extent out of it
//! let mut file = DataFile::new(0, StorageOptions::default());
//! file.open(&ctx, Path::new("db.0"), 0, false).unwrap();
//! let extent = file.alloc_extent_area(&ctx, 4096).unwrap();
//! journal.commit_transaction();
//! ```

pub mod common;
pub mod context;
pub mod durability;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{StorageOptions, HEADER_SIZE, PAGE_SIZE};
pub use common::{DiskLoc, Error, FatalError, Result};

pub use context::OperationContext;
pub use durability::{DurableWriteGateway, Journal};
pub use storage::{DataFile, DataFileHeader, DataFileVersion, InitOutcome};
