use crate::error::{Result, StorageError};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A short URL together with its usage counters.
///
/// Which fields are populated depends on the operation that produced the
/// record: `source_id`/`source_uses` are only meaningful for per-source
/// lookups and visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The destination the short URL points to.
    pub full_url: String,
    /// The short identifier. Primary lookup key.
    pub short_url: String,
    /// The owner's secondary identifier.
    pub admin_url: String,
    /// Visits across all sources.
    pub total_uses: i64,
    /// The source a per-source counter was read for.
    pub source_id: Option<String>,
    /// Visits from `source_id`.
    pub source_uses: i64,
    /// When the short URL was last observed.
    pub last_used: Option<Timestamp>,
}

impl UrlRecord {
    /// A freshly registered record with zeroed counters.
    pub fn registered(
        full_url: impl Into<String>,
        short_url: impl Into<String>,
        admin_url: impl Into<String>,
        registered_at: Timestamp,
    ) -> Self {
        Self {
            full_url: full_url.into(),
            short_url: short_url.into(),
            admin_url: admin_url.into(),
            last_used: Some(registered_at),
            ..Self::default()
        }
    }

    /// True when no base row was found for this record.
    pub fn is_unresolved(&self) -> bool {
        self.full_url.is_empty()
    }
}

/// One per-source usage counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitSource {
    pub source_id: String,
    pub uses: i64,
}

impl VisitSource {
    pub fn new(source_id: impl Into<String>, uses: i64) -> Self {
        Self {
            source_id: source_id.into(),
            uses,
        }
    }
}

/// The identifier a record is resolved by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LookupKey {
    Short(String),
    Admin(String),
}

impl LookupKey {
    /// Picks a key from a caller-supplied `(short_url, admin_url)` pair.
    ///
    /// The admin URL wins when both are set. Both empty is a caller error.
    pub fn from_parts(short_url: &str, admin_url: &str) -> Result<Self> {
        if !admin_url.is_empty() {
            Ok(LookupKey::Admin(admin_url.to_owned()))
        } else if !short_url.is_empty() {
            Ok(LookupKey::Short(short_url.to_owned()))
        } else {
            Err(StorageError::InvalidArgument(
                "either a short url or an admin url is required".to_string(),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LookupKey::Short(key) | LookupKey::Admin(key) => key,
        }
    }
}

/// How resolution reacts to a missing row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissPolicy {
    /// Missing rows leave the corresponding fields zero-valued.
    #[default]
    Tolerant,
    /// A missing admin, base or aggregate row is [`StorageError::NotFound`].
    FailFast,
}

/// Parameters of a resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveQuery {
    pub key: LookupKey,
    /// Also read the per-source counter for this source.
    pub source_id: Option<String>,
    pub miss_policy: MissPolicy,
}

impl ResolveQuery {
    pub fn new(key: LookupKey) -> Self {
        Self {
            key,
            source_id: None,
            miss_policy: MissPolicy::default(),
        }
    }

    pub fn short(short_url: impl Into<String>) -> Self {
        Self::new(LookupKey::Short(short_url.into()))
    }

    pub fn admin(admin_url: impl Into<String>) -> Self {
        Self::new(LookupKey::Admin(admin_url.into()))
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_miss_policy(mut self, miss_policy: MissPolicy) -> Self {
        self.miss_policy = miss_policy;
        self
    }

    /// Rejects queries without a usable key.
    pub fn validate(&self) -> Result<()> {
        if self.key.as_str().is_empty() {
            return Err(StorageError::InvalidArgument(
                "lookup key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Renders per-source counters as the plain-text report shown to owners.
pub fn visit_report<'a>(sources: impl IntoIterator<Item = &'a VisitSource>) -> String {
    sources
        .into_iter()
        .fold(String::new(), |mut report, source| {
            // writing into a String cannot fail
            let _ = writeln!(
                report,
                "IP: {} # Redirects: {}",
                source.source_id, source.uses
            );
            report
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_key_wins_over_short_key() {
        let key = LookupKey::from_parts("ab12", "zzXY").unwrap();
        assert_eq!(key, LookupKey::Admin("zzXY".to_string()));
    }

    #[test]
    fn short_key_used_when_admin_is_empty() {
        let key = LookupKey::from_parts("ab12", "").unwrap();
        assert_eq!(key, LookupKey::Short("ab12".to_string()));
    }

    #[test]
    fn both_keys_empty_is_invalid() {
        let err = LookupKey::from_parts("", "").unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
    }

    #[test]
    fn empty_query_key_is_invalid() {
        let err = ResolveQuery::short("").validate().unwrap_err();
        assert!(matches!(err, StorageError::InvalidArgument(_)));
        assert!(ResolveQuery::admin("zzXY").validate().is_ok());
    }

    #[test]
    fn query_defaults_to_tolerant_without_source() {
        let query = ResolveQuery::short("ab12");
        assert_eq!(query.miss_policy, MissPolicy::Tolerant);
        assert_eq!(query.source_id, None);

        let query = query
            .with_source("203.0.113.5")
            .with_miss_policy(MissPolicy::FailFast);
        assert_eq!(query.source_id.as_deref(), Some("203.0.113.5"));
        assert_eq!(query.miss_policy, MissPolicy::FailFast);
    }

    #[test]
    fn registered_record_starts_at_zero() {
        let now = Timestamp::now();
        let record = UrlRecord::registered("https://example.com", "ab12", "zzXY", now);
        assert_eq!(record.total_uses, 0);
        assert_eq!(record.source_uses, 0);
        assert_eq!(record.last_used, Some(now));
        assert!(!record.is_unresolved());
        assert!(UrlRecord::default().is_unresolved());
    }

    #[test]
    fn report_lists_one_line_per_source() {
        let sources = vec![
            VisitSource::new("0.0.0.0", 1),
            VisitSource::new("203.0.113.5", 2),
        ];
        assert_eq!(
            visit_report(&sources),
            "IP: 0.0.0.0 # Redirects: 1\nIP: 203.0.113.5 # Redirects: 2\n"
        );
        assert_eq!(visit_report(&[]), "");
    }
}
