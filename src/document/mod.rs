//! Document cache and its filesystem backing store.

pub mod cache;
pub mod store;

pub use cache::{Document, DocumentCache};
pub use store::{DocumentStore, DocumentStoreError};
