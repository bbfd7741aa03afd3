//! service-core: Shared infrastructure for the devotional content services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod response;
pub mod retry;
pub mod utils;

pub use axum;
pub use secrecy;
pub use serde_json;
pub use tokio;
pub use tracing;
