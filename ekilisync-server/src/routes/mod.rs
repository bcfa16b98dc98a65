//! Routes for [axum::Router].

pub mod attendances;
pub mod auth;
pub mod employees;
pub mod fallback;
pub mod health;
pub mod identities;
pub mod offices;
pub mod ping;
