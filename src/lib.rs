//! taskdeck — client-side task mutation and ordering engine.
//!
//! Keeps an in-memory task collection consistent with a remote row store
//! under concurrent, possibly-failing operations: optimistic local
//! application with exact rollback, manual drag reordering, multi-select
//! bulk actions, and time-boxed undo of destructive operations.
//!
//! The entry point is [`engine::TaskEngine`], which owns the cache,
//! selection, undo buffer and toast hub, and talks to any
//! [`store::RemoteStore`] implementation.

pub mod cache;
pub mod engine;
pub mod error;
pub mod notify;
pub mod ordering;
pub mod selection;
pub mod store;
pub mod types;
pub mod undo;
pub mod view;

pub use engine::TaskEngine;
pub use error::{EngineError, Result, ValidationError};
pub use store::{MemoryStore, RemoteStore, StoreError};
pub use types::{BulkPatch, NewTask, OrderEntry, Priority, Task, TaskDraft, TaskPatch};
pub use view::{Filter, SortKey, ViewState};
