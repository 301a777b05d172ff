//! Core types and traits for the bitme URL shortener.
//!
//! This crate provides the domain entity shared between the storage engine
//! and its callers, the storage error taxonomy, and the [`UrlStore`]
//! capability trait every backend implements.

pub mod error;
pub mod record;
pub mod store;

pub use error::{Result, StorageError, WriteErrorKind};
pub use record::{visit_report, LookupKey, MissPolicy, ResolveQuery, UrlRecord, VisitSource};
pub use store::{UrlStore, VisitSourceStream};
