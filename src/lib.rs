pub mod config;
pub mod fetch;
pub mod infra;
pub mod normalize;
pub mod output;
pub mod ratings;
pub mod services;
pub mod sync;
