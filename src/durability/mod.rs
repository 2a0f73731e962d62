//! Durable writes to mapped memory.
//!
//! Every change to a data file's header goes through this module.
//!
//! # Components
//! - [`DurableWriteGateway`] - Contract with the durability subsystem
//! - [`WriteUnitOfWork`] / [`DurableWriteGuard`] - Scoped, undoable write access
//! - [`Journal`] - In-memory write-ahead ledger implementing the gateway

mod gateway;
mod journal;
mod unit_of_work;

pub use gateway::{DurableWriteGateway, WriteRecord, WriteScope};
pub use journal::{CreatedFile, Journal, JournalGroup};
pub use unit_of_work::{DurableWriteGuard, WriteUnitOfWork};
