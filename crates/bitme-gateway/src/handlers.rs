mod admin;
mod health;
mod url;

pub use admin::{admin_handler, report_handler};
pub use health::health_handler;
pub use url::{create_url_handler, get_url_handler, redirect_handler};
