//! Additional [axum::middleware].

pub mod metrics;
pub mod request_ulid;
pub mod runtime;
