// Library root — exposes internals for integration tests and crate consumers.
// The binary entry point is src/main.rs.

pub mod cache;
pub mod coach;
pub mod config;
pub mod error;
pub mod genai;
pub mod logger;
pub mod retry;
