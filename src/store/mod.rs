//! Durable key-value storage for cached assets.
//!
//! Assets are addressed by a canonical origin-independent key (path plus
//! query) so that install-time seeding and request-time interception agree
//! on identity. The store upserts by key and never evicts; a schema version
//! bump is the only thing that clears it.

mod keys;
mod storage;

pub use keys::canonical_key;
pub use storage::{AssetStorage, CachedAsset, MemoryStorage, SqliteStorage};
