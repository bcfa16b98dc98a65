#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs, rust_2018_idioms, unreachable_pub)]

//! ekilisync-server

pub mod app_state;
pub mod crypto;
pub mod db;
pub mod docs;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod router;
pub mod routes;
pub mod services;
pub mod settings;
pub mod setups;
pub mod store;

#[cfg(test)]
mod test_utils;
