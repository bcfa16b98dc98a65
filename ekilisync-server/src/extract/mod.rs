//! Custom [axum::extract] Extractors.

pub mod caller;
pub mod json;

pub use caller::Caller;
pub use json::Json;
