//! service-core: Shared infrastructure for the health assistant services.
pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;
pub mod retry;

pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tokio_util;
pub use tower_http;
pub use tracing;
pub use validator;
