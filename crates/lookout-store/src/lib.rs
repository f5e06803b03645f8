//! lookout-store — Persistence and caching for the watch list.
//!
//! [`FaceStore`] is the durable SQLite table of registered faces;
//! [`FaceCache`] is the process-wide in-memory mirror that matching reads
//! from, rebuilt in full after every store mutation.

pub mod cache;
pub mod store;

pub use cache::FaceCache;
pub use store::{FaceStore, StoreError};
