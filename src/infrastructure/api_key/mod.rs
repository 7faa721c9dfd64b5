//! API key infrastructure implementations
//!
//! Key generation, the SQLite and in-memory stores, and the service that
//! authorizes and issues keys on top of them.

mod generator;
mod in_memory;
mod key_locks;
mod service;
mod sqlite_store;

pub use generator::{KeyGenerator, DEFAULT_KEY_PREFIX};
pub use in_memory::InMemoryKeyStore;
pub use key_locks::{KeyGuard, KeyLocks};
pub(crate) use service::key_prefix;
pub use service::{ApiKeyService, StoreAccessPolicy};
pub use sqlite_store::{parse_issued_at, SqliteKeyStore, STORED_TIMESTAMP_FORMAT};
