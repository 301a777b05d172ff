//! Typed statements against the four `bitme` tables.
//!
//! Every function runs exactly one statement on the executor it is given,
//! which is either the pool (one connection per statement) or an open
//! transaction. "No matching row" comes back as `None`; any other failure is
//! returned as the driver error for the caller to classify.

use futures::stream::BoxStream;
use futures::StreamExt;
use jiff::Timestamp;
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};

/// The DDL for all four tables. Safe to apply repeatedly.
pub const SCHEMA_DDL: &str = include_str!("../ddl/postgres/bitme.sql");

/// A row of `bitme.urldata`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageRow {
    pub total_uses: i64,
    pub last_used: Timestamp,
}

/// A row of `bitme.urlusedata`, without its short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUsageRow {
    pub source_id: String,
    pub uses: i64,
}

/// A row of `bitme.urldata` joined with the target of its short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitRow {
    pub usage: UsageRow,
    pub full_url: String,
}

// Timestamps cross the wire as integer microseconds since the Unix epoch and
// are rebuilt as `TIMESTAMPTZ 'epoch' + $n * INTERVAL '1 microsecond'`.
fn epoch_micros(at: Timestamp) -> i64 {
    at.as_microsecond()
}

fn decode_timestamp(micros: i64) -> sqlx::Result<Timestamp> {
    Timestamp::from_microsecond(micros).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn decode_usage(row: &PgRow) -> sqlx::Result<UsageRow> {
    Ok(UsageRow {
        total_uses: row.try_get("total_num_of_uses")?,
        last_used: decode_timestamp(row.try_get("last_used_us")?)?,
    })
}

pub async fn insert_base<'e, E>(executor: E, short_url: &str, full_url: &str) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO bitme.urlbase (short_url, full_url)
        VALUES ($1, $2)
        "#,
    )
    .bind(short_url)
    .bind(full_url)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_admin<'e, E>(executor: E, admin_url: &str, short_url: &str) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO bitme.adminurl (admin_url, short_url)
        VALUES ($1, $2)
        "#,
    )
    .bind(admin_url)
    .bind(short_url)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Inserts the zero-valued aggregate counter of a new short URL.
pub async fn insert_usage<'e, E>(executor: E, short_url: &str, at: Timestamp) -> sqlx::Result<u64>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO bitme.urldata (short_url, last_used, total_num_of_uses)
        VALUES ($1, TIMESTAMPTZ 'epoch' + $2::BIGINT * INTERVAL '1 microsecond', 0)
        "#,
    )
    .bind(short_url)
    .bind(epoch_micros(at))
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn select_short_url_by_admin<'e, E>(
    executor: E,
    admin_url: &str,
) -> sqlx::Result<Option<String>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        SELECT short_url
        FROM bitme.adminurl
        WHERE admin_url = $1
        "#,
    )
    .bind(admin_url)
    .fetch_optional(executor)
    .await
}

pub async fn select_full_url<'e, E>(executor: E, short_url: &str) -> sqlx::Result<Option<String>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        SELECT full_url
        FROM bitme.urlbase
        WHERE short_url = $1
        "#,
    )
    .bind(short_url)
    .fetch_optional(executor)
    .await
}

pub async fn select_usage<'e, E>(executor: E, short_url: &str) -> sqlx::Result<Option<UsageRow>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        SELECT total_num_of_uses,
               (EXTRACT(EPOCH FROM last_used) * 1000000)::BIGINT AS last_used_us
        FROM bitme.urldata
        WHERE short_url = $1
        "#,
    )
    .bind(short_url)
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(decode_usage).transpose()
}

pub async fn select_source_uses<'e, E>(
    executor: E,
    source_id: &str,
    short_url: &str,
) -> sqlx::Result<Option<i64>>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        SELECT ip_num_of_uses
        FROM bitme.urlusedata
        WHERE ip = $1 AND short_url = $2
        "#,
    )
    .bind(source_id)
    .bind(short_url)
    .fetch_optional(executor)
    .await
}

/// Creates the per-source counter at 1, or increments it if it exists.
///
/// Postgres evaluates the conflict branch under the row lock, so concurrent
/// calls for the same key serialize here. Returns the new count.
pub async fn upsert_source_usage<'e, E>(
    executor: E,
    source_id: &str,
    short_url: &str,
    at: Timestamp,
) -> sqlx::Result<i64>
where
    E: PgExecutor<'e>,
{
    sqlx::query_scalar(
        r#"
        INSERT INTO bitme.urlusedata AS u (ip, short_url, last_used, ip_num_of_uses)
        VALUES ($1, $2, TIMESTAMPTZ 'epoch' + $3::BIGINT * INTERVAL '1 microsecond', 1)
        ON CONFLICT (ip, short_url) DO UPDATE
        SET ip_num_of_uses = u.ip_num_of_uses + 1,
            last_used = GREATEST(u.last_used, EXCLUDED.last_used)
        RETURNING ip_num_of_uses
        "#,
    )
    .bind(source_id)
    .bind(short_url)
    .bind(epoch_micros(at))
    .fetch_one(executor)
    .await
}

/// Increments the aggregate counter and returns it with the short URL's
/// target. `None` when the short URL has no aggregate row.
pub async fn increment_usage<'e, E>(
    executor: E,
    short_url: &str,
    at: Timestamp,
) -> sqlx::Result<Option<VisitRow>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(
        r#"
        UPDATE bitme.urldata AS d
        SET total_num_of_uses = d.total_num_of_uses + 1,
            last_used = GREATEST(
                d.last_used,
                TIMESTAMPTZ 'epoch' + $2::BIGINT * INTERVAL '1 microsecond'
            )
        FROM bitme.urlbase AS b
        WHERE d.short_url = $1 AND b.short_url = d.short_url
        RETURNING d.total_num_of_uses,
                  (EXTRACT(EPOCH FROM d.last_used) * 1000000)::BIGINT AS last_used_us,
                  b.full_url
        "#,
    )
    .bind(short_url)
    .bind(epoch_micros(at))
    .fetch_optional(executor)
    .await?;

    row.as_ref()
        .map(|row| -> sqlx::Result<VisitRow> {
            Ok(VisitRow {
                usage: decode_usage(row)?,
                full_url: row.try_get("full_url")?,
            })
        })
        .transpose()
}

/// Streams every per-source counter of a short URL.
pub fn source_usage_rows<'e, E>(
    executor: E,
    short_url: String,
) -> BoxStream<'e, sqlx::Result<SourceUsageRow>>
where
    E: PgExecutor<'e> + 'e,
{
    sqlx::query(
        r#"
        SELECT ip, ip_num_of_uses
        FROM bitme.urlusedata
        WHERE short_url = $1
        "#,
    )
    .bind(short_url)
    .fetch(executor)
    .map(|row| -> sqlx::Result<SourceUsageRow> {
        let row = row?;
        Ok(SourceUsageRow {
            source_id: row.try_get("ip")?,
            uses: row.try_get("ip_num_of_uses")?,
        })
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_micros_is_exact_past_2038() {
        let micros = 4_102_444_800_123_457;
        let at = Timestamp::from_microsecond(micros).unwrap();
        assert_eq!(epoch_micros(at), micros);
        assert_eq!(decode_timestamp(epoch_micros(at)).unwrap(), at);
    }

    #[test]
    fn decode_timestamp_round_trips_microseconds() {
        let at = decode_timestamp(1_700_000_000_123_456).unwrap();
        assert_eq!(at.as_microsecond(), 1_700_000_000_123_456);
    }

    #[test]
    fn ddl_creates_all_tables() {
        for table in ["urlbase", "adminurl", "urldata", "urlusedata"] {
            assert!(SCHEMA_DDL.contains(&format!("bitme.{table} (")));
        }
    }
}
