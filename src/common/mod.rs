//! Common types and utilities shared across extentstore.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`StorageOptions`](config::StorageOptions)
//! - Error types
//! - [`DiskLoc`] addresses

pub mod config;
mod disk_loc;
pub mod error;

pub use disk_loc::DiskLoc;
pub use error::{Error, FatalError, Result};
