pub mod metrics;
pub mod model_client;
pub mod prompt;
pub mod providers;
pub mod tips;

pub use model_client::{ModelClient, ModelError};
