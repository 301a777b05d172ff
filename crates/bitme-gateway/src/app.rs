use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    admin_handler, create_url_handler, get_url_handler, health_handler, redirect_handler,
    report_handler,
};
use crate::state::AppState;

pub struct App {}

impl App {
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/{short_url}", get(redirect_handler))
            .nest(
                "/v1",
                Router::new()
                    .route("/urls", post(create_url_handler))
                    .route("/urls/{short_url}", get(get_url_handler))
                    .route("/admin/{admin_url}", get(admin_handler))
                    .route("/admin/{admin_url}/report", get(report_handler)),
            )
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
