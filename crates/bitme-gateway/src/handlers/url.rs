use crate::error::{AppError, Result};
use crate::model::{CreateUrlRequest, CreateUrlResponse, UrlResponse};
use crate::source::ClientSource;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Redirect;
use axum::Json;
use bitme_core::{ResolveQuery, WriteErrorKind};
use jiff::Timestamp;
use tracing::{debug, warn};

/// Fresh code pairs tried before giving up on a registration.
pub const MAX_REGISTER_ATTEMPTS: usize = 3;

pub async fn create_url_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateUrlRequest>,
) -> Result<(StatusCode, Json<CreateUrlResponse>)> {
    let full_url = request.full_url.trim();
    if full_url.is_empty() {
        return Err(AppError::BadRequest("full_url is required".to_string()));
    }
    // The target is sent back verbatim in the redirect's Location header.
    if HeaderValue::from_str(full_url).is_err() {
        return Err(AppError::BadRequest(
            "full_url cannot be used as a redirect location".to_string(),
        ));
    }

    for attempt in 1..=MAX_REGISTER_ATTEMPTS {
        let (short_url, admin_url) = state.next_codes();
        match state.store().register(full_url, &short_url, &admin_url).await {
            Ok(record) => {
                debug!(short_url = %record.short_url, attempt, "short url created");
                return Ok((StatusCode::CREATED, Json(record.into())));
            }
            Err(err) if err.write_kind() == Some(WriteErrorKind::DuplicateKey) => {
                warn!(short_url = %short_url, attempt, "code collision, drawing new codes");
            }
            Err(err) => return Err(err.into()),
        }
    }

    Err(AppError::CodesExhausted(MAX_REGISTER_ATTEMPTS))
}

pub async fn get_url_handler(
    Path(short_url): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UrlResponse>> {
    let query = ResolveQuery::short(short_url.as_str()).with_miss_policy(state.miss_policy());
    let record = state.store().resolve(&query).await?;
    if record.is_unresolved() {
        return Err(AppError::NotFound(format!("short url '{short_url}'")));
    }

    Ok(Json(record.into()))
}

/// Counts the visit and sends the client on to the full URL.
///
/// The visit is recorded in the same transaction that reads the target, so
/// an unknown short URL leaves no per-source row behind.
pub async fn redirect_handler(
    Path(short_url): Path<String>,
    State(state): State<AppState>,
    ClientSource(source): ClientSource,
) -> Result<Redirect> {
    let record = state
        .store()
        .record_visit(&short_url, &source, Timestamp::now())
        .await
        .map_err(|err| match err.write_kind() {
            Some(WriteErrorKind::Unregistered) => {
                AppError::NotFound(format!("short url '{short_url}'"))
            }
            _ => err.into(),
        })?;

    Ok(Redirect::temporary(&record.full_url))
}
