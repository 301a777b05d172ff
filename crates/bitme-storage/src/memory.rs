use async_trait::async_trait;
use bitme_core::{
    LookupKey, MissPolicy, ResolveQuery, Result, StorageError, UrlRecord, UrlStore, VisitSource,
    VisitSourceStream,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use jiff::Timestamp;

/// Base row and aggregate counter of one short URL.
#[derive(Debug, Clone)]
struct UrlEntry {
    full_url: String,
    total_uses: i64,
    last_used: Timestamp,
}

#[derive(Debug, Clone, Copy)]
struct SourceEntry {
    uses: i64,
    last_used: Timestamp,
}

/// In-memory implementation of [`UrlStore`] using DashMap.
///
/// Registration claims the admin URL and then the short URL through entry
/// guards, always in that order, so two registrations can never both win a
/// key. A visit holds the short URL's guard while bumping the per-source
/// counter, which makes the pair of increments a single unit.
#[derive(Debug, Default)]
pub struct InMemoryUrlStore {
    urls: DashMap<String, UrlEntry>,
    admin_index: DashMap<String, String>,
    usage: DashMap<(String, String), SourceEntry>,
}

impl InMemoryUrlStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered short URLs.
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

fn miss(policy: MissPolicy, what: &str, key: &str) -> Result<()> {
    match policy {
        MissPolicy::FailFast => Err(StorageError::NotFound(format!("{what} '{key}'"))),
        MissPolicy::Tolerant => Ok(()),
    }
}

#[async_trait]
impl UrlStore for InMemoryUrlStore {
    async fn register(
        &self,
        full_url: &str,
        short_url: &str,
        admin_url: &str,
    ) -> Result<UrlRecord> {
        if short_url.is_empty() || admin_url.is_empty() {
            return Err(StorageError::InvalidArgument(
                "short url and admin url are required".to_string(),
            ));
        }

        let registered_at = Timestamp::now();

        let Entry::Vacant(admin_slot) = self.admin_index.entry(admin_url.to_owned()) else {
            return Err(StorageError::duplicate_key(format!(
                "admin url '{admin_url}' already exists"
            )));
        };
        let Entry::Vacant(url_slot) = self.urls.entry(short_url.to_owned()) else {
            return Err(StorageError::duplicate_key(format!(
                "short url '{short_url}' already exists"
            )));
        };

        url_slot.insert(UrlEntry {
            full_url: full_url.to_owned(),
            total_uses: 0,
            last_used: registered_at,
        });
        admin_slot.insert(short_url.to_owned());

        Ok(UrlRecord::registered(
            full_url,
            short_url,
            admin_url,
            registered_at,
        ))
    }

    async fn resolve(&self, query: &ResolveQuery) -> Result<UrlRecord> {
        query.validate()?;
        let mut record = UrlRecord::default();

        record.short_url = match &query.key {
            LookupKey::Short(short_url) => short_url.clone(),
            LookupKey::Admin(admin_url) => {
                record.admin_url = admin_url.clone();
                match self.admin_index.get(admin_url) {
                    Some(short_url) => short_url.value().clone(),
                    None => {
                        miss(query.miss_policy, "admin url", admin_url)?;
                        String::new()
                    }
                }
            }
        };

        match self.urls.get(&record.short_url) {
            Some(entry) => {
                record.full_url = entry.full_url.clone();
                record.total_uses = entry.total_uses;
                record.last_used = Some(entry.last_used);
            }
            None => miss(query.miss_policy, "short url", &record.short_url)?,
        }

        if let Some(source_id) = &query.source_id {
            record.source_uses = self
                .usage
                .get(&(source_id.clone(), record.short_url.clone()))
                .map(|entry| entry.uses)
                .unwrap_or(0);
            record.source_id = Some(source_id.clone());
        }

        Ok(record)
    }

    async fn record_visit(
        &self,
        short_url: &str,
        source_id: &str,
        last_used: Timestamp,
    ) -> Result<UrlRecord> {
        if short_url.is_empty() || source_id.is_empty() {
            return Err(StorageError::InvalidArgument(
                "short url and source id are required".to_string(),
            ));
        }

        let Some(mut url) = self.urls.get_mut(short_url) else {
            return Err(StorageError::unregistered(short_url));
        };

        let source_uses = {
            let mut source = self
                .usage
                .entry((source_id.to_owned(), short_url.to_owned()))
                .or_insert(SourceEntry {
                    uses: 0,
                    last_used,
                });
            source.uses += 1;
            source.last_used = source.last_used.max(last_used);
            source.uses
        };

        url.total_uses += 1;
        url.last_used = url.last_used.max(last_used);

        Ok(UrlRecord {
            full_url: url.full_url.clone(),
            short_url: short_url.to_owned(),
            admin_url: String::new(),
            total_uses: url.total_uses,
            source_id: Some(source_id.to_owned()),
            source_uses,
            last_used: Some(url.last_used),
        })
    }

    fn list_visit_sources<'a>(&'a self, short_url: &'a str) -> VisitSourceStream<'a> {
        let sources: Vec<Result<VisitSource>> = self
            .usage
            .iter()
            .filter(|entry| entry.key().1 == short_url)
            .map(|entry| Ok(VisitSource::new(entry.key().0.clone(), entry.value().uses)))
            .collect();
        stream::iter(sources).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitme_core::WriteErrorKind;
    use futures::TryStreamExt;
    use std::sync::Arc;

    async fn store_with(short_url: &str, admin_url: &str) -> InMemoryUrlStore {
        let store = InMemoryUrlStore::new();
        store
            .register("https://example.com", short_url, admin_url)
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn register_then_resolve_by_short_and_admin() {
        let store = store_with("ab12", "zzXY").await;

        let by_short = store.resolve(&ResolveQuery::short("ab12")).await.unwrap();
        assert_eq!(by_short.full_url, "https://example.com");
        assert_eq!(by_short.total_uses, 0);

        let by_admin = store.resolve(&ResolveQuery::admin("zzXY")).await.unwrap();
        assert_eq!(by_admin.short_url, "ab12");
        assert_eq!(by_admin.full_url, "https://example.com");
        assert_eq!(by_admin.admin_url, "zzXY");
    }

    #[tokio::test]
    async fn duplicate_short_url_leaves_no_admin_row() {
        let store = store_with("ab12", "zzXY").await;

        let err = store
            .register("https://other.example", "ab12", "fresh")
            .await
            .unwrap_err();
        assert_eq!(err.write_kind(), Some(WriteErrorKind::DuplicateKey));

        let record = store.resolve(&ResolveQuery::admin("fresh")).await.unwrap();
        assert!(record.is_unresolved());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_admin_url_is_rejected() {
        let store = store_with("ab12", "zzXY").await;

        let err = store
            .register("https://other.example", "cd34", "zzXY")
            .await
            .unwrap_err();
        assert_eq!(err.write_kind(), Some(WriteErrorKind::DuplicateKey));

        let record = store.resolve(&ResolveQuery::short("cd34")).await.unwrap();
        assert!(record.is_unresolved());
    }

    #[tokio::test]
    async fn unknown_key_resolves_to_zero_values() {
        let store = InMemoryUrlStore::new();

        let record = store
            .resolve(&ResolveQuery::admin("nope").with_source("0.0.0.0"))
            .await
            .unwrap();
        assert_eq!(record.short_url, "");
        assert_eq!(record.full_url, "");
        assert_eq!(record.total_uses, 0);
        assert_eq!(record.source_uses, 0);
    }

    #[tokio::test]
    async fn fail_fast_reports_missing_keys() {
        let store = InMemoryUrlStore::new();

        let err = store
            .resolve(&ResolveQuery::short("nope").with_miss_policy(MissPolicy::FailFast))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err = store
            .resolve(&ResolveQuery::admin("nope").with_miss_policy(MissPolicy::FailFast))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn visits_increment_both_counters() {
        let store = store_with("ab12", "zzXY").await;
        let now = Timestamp::now();

        store.record_visit("ab12", "203.0.113.5", now).await.unwrap();
        let record = store.record_visit("ab12", "203.0.113.5", now).await.unwrap();
        assert_eq!(record.source_uses, 2);
        assert_eq!(record.total_uses, 2);

        let sources: Vec<VisitSource> = store.list_visit_sources("ab12").try_collect().await.unwrap();
        assert_eq!(sources, vec![VisitSource::new("203.0.113.5", 2)]);

        let resolved = store
            .resolve(&ResolveQuery::short("ab12").with_source("203.0.113.5"))
            .await
            .unwrap();
        assert_eq!(resolved.total_uses, 2);
        assert_eq!(resolved.source_uses, 2);
    }

    #[tokio::test]
    async fn visit_to_unregistered_url_is_rejected() {
        let store = InMemoryUrlStore::new();

        let err = store
            .record_visit("nope", "0.0.0.0", Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.write_kind(), Some(WriteErrorKind::Unregistered));
        assert_eq!(store.list_visit_sources("nope").count().await, 0);
    }

    #[tokio::test]
    async fn last_used_never_moves_backwards() {
        let store = store_with("ab12", "zzXY").await;
        let later = Timestamp::now() + jiff::SignedDuration::from_secs(60);
        let earlier = Timestamp::now() - jiff::SignedDuration::from_secs(60);

        store.record_visit("ab12", "0.0.0.0", later).await.unwrap();
        let record = store.record_visit("ab12", "0.0.0.0", earlier).await.unwrap();
        assert_eq!(record.last_used, Some(later));
    }

    #[tokio::test]
    async fn concurrent_visits_from_one_source_are_all_counted() {
        let store = Arc::new(store_with("ab12", "zzXY").await);

        let handles: Vec<_> = (0..64)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .record_visit("ab12", "203.0.113.5", Timestamp::now())
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let record = store
            .resolve(&ResolveQuery::short("ab12").with_source("203.0.113.5"))
            .await
            .unwrap();
        assert_eq!(record.source_uses, 64);
        assert_eq!(record.total_uses, 64);
    }
}
