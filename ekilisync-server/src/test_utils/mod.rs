//! Testing utilities
pub mod memory_store;
pub mod route_builder;
pub mod test_context;
