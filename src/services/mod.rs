//! Seams to external services.

pub mod database_api;
