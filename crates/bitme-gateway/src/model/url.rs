use bitme_core::{UrlRecord, VisitSource};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUrlRequest {
    pub full_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUrlResponse {
    pub full_url: String,
    pub short_url: String,
    pub admin_url: String,
}

impl From<UrlRecord> for CreateUrlResponse {
    fn from(record: UrlRecord) -> Self {
        Self {
            full_url: record.full_url,
            short_url: record.short_url,
            admin_url: record.admin_url,
        }
    }
}

/// Public view of a short URL. Never exposes the admin URL.
#[derive(Debug, Serialize, Deserialize)]
pub struct UrlResponse {
    pub full_url: String,
    pub short_url: String,
    pub total_uses: i64,
    pub last_used: Option<Timestamp>,
}

impl From<UrlRecord> for UrlResponse {
    fn from(record: UrlRecord) -> Self {
        Self {
            full_url: record.full_url,
            short_url: record.short_url,
            total_uses: record.total_uses,
            last_used: record.last_used,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUrlResponse {
    pub full_url: String,
    pub short_url: String,
    pub admin_url: String,
    pub total_uses: i64,
    pub last_used: Option<Timestamp>,
    pub sources: Vec<VisitSource>,
}

impl AdminUrlResponse {
    pub fn new(record: UrlRecord, sources: Vec<VisitSource>) -> Self {
        Self {
            full_url: record.full_url,
            short_url: record.short_url,
            admin_url: record.admin_url,
            total_uses: record.total_uses,
            last_used: record.last_used,
            sources,
        }
    }
}
