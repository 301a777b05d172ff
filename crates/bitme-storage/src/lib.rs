//! Storage backends for bitme.
//!
//! [`PgUrlStore`] is the production engine: it composes the statements in
//! [`schema`] into transactional operations over a bounded [`StorePool`].
//! [`InMemoryUrlStore`] implements the same contract without a database.

pub mod error;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod schema;

pub use bitme_core::{
    LookupKey, MissPolicy, ResolveQuery, Result, StorageError, UrlRecord, UrlStore, VisitSource,
    WriteErrorKind,
};
pub use memory::InMemoryUrlStore;
pub use pool::{PoolConfig, StorePool};
pub use postgres::PgUrlStore;
