//! HTTP front end of the bitme storage engine.
//!
//! Handlers decode requests, call into a [`UrlStore`](bitme_core::UrlStore)
//! and serialize the result. All state lives in the store.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod source;
pub mod state;

pub use app::App;
pub use state::AppState;
