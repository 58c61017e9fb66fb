//! hearth-storage — grouped-record persistence for the hearth controller.
//!
//! One JSON record per configured thing, per rule, and per engine
//! bookkeeping entry. The [`Store`] trait is the only surface the core sees;
//! [`FileStore`] backs the daemon, [`MemoryStore`] backs tests.
//!
//! Writes are atomic at the record level: after a crash either the old or
//! the new document is observable, never a torn one. The file backing keeps
//! everything under permissions restricted to the service user, since thing
//! params may carry credentials.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use store::{Store, get_record, list_records, namespaces, put_record};
