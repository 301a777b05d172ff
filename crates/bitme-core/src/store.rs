use crate::error::Result;
use crate::record::{ResolveQuery, UrlRecord, VisitSource};
use async_trait::async_trait;
use futures::stream::BoxStream;
use jiff::Timestamp;

/// A lazy stream of per-source counters.
pub type VisitSourceStream<'a> = BoxStream<'a, Result<VisitSource>>;

/// The storage engine contract.
///
/// Every backend maps these four operations onto its own storage while
/// keeping the same atomicity guarantees: a failed `register` leaves nothing
/// behind, and concurrent `record_visit` calls for the same
/// `(short_url, source_id)` never lose an increment.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Registers a new short URL with zeroed counters.
    ///
    /// Fails with a `DuplicateKey` write error if either identifier is taken.
    async fn register(&self, full_url: &str, short_url: &str, admin_url: &str)
        -> Result<UrlRecord>;

    /// Resolves a short or admin URL to its record and usage counters.
    ///
    /// Misses are reported according to the query's
    /// [`MissPolicy`](crate::MissPolicy).
    async fn resolve(&self, query: &ResolveQuery) -> Result<UrlRecord>;

    /// Counts one visit from `source_id`.
    ///
    /// Increments the per-source counter (creating it at 1) and then the
    /// aggregate counter, as a single unit.
    async fn record_visit(
        &self,
        short_url: &str,
        source_id: &str,
        last_used: Timestamp,
    ) -> Result<UrlRecord>;

    /// Streams every per-source counter of a short URL, in no particular
    /// order. An unknown short URL yields an empty stream.
    fn list_visit_sources<'a>(&'a self, short_url: &'a str) -> VisitSourceStream<'a>;
}
