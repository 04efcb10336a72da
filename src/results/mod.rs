//! Results store: failure history between runs.
//!
//! Each performed request is identified by its [`Fingerprint`]. The store
//! keeps one [`ResultEntry`] per failing fingerprint, namespaced by the site
//! document it came from, and is persisted as JSON between runs. Concurrent
//! runs are serialized with a [`StoreLock`].

mod fingerprint;
mod lock;
mod store;

pub use fingerprint::Fingerprint;
pub use lock::StoreLock;
pub use store::{ResultEntry, ResultsStore, RetentionPolicy};
