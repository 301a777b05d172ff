use crate::error::{AppError, Result};
use crate::model::AdminUrlResponse;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use bitme_core::{visit_report, ResolveQuery, UrlRecord, VisitSource};
use futures::TryStreamExt;

async fn load(state: &AppState, admin_url: &str) -> Result<(UrlRecord, Vec<VisitSource>)> {
    let query = ResolveQuery::admin(admin_url).with_miss_policy(state.miss_policy());
    let record = state.store().resolve(&query).await?;
    if record.is_unresolved() {
        return Err(AppError::NotFound(format!("admin url '{admin_url}'")));
    }

    let mut sources: Vec<VisitSource> = state
        .store()
        .list_visit_sources(&record.short_url)
        .try_collect()
        .await?;
    sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    Ok((record, sources))
}

pub async fn admin_handler(
    Path(admin_url): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AdminUrlResponse>> {
    let (record, sources) = load(&state, &admin_url).await?;
    Ok(Json(AdminUrlResponse::new(record, sources)))
}

pub async fn report_handler(
    Path(admin_url): Path<String>,
    State(state): State<AppState>,
) -> Result<String> {
    let (_, sources) = load(&state, &admin_url).await?;
    Ok(visit_report(&sources))
}
