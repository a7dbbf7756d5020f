//! Storage layer: the transactional inventory store boundary and its
//! implementations.
//!
//! The store is an explicitly passed handle (no process-wide singleton) so
//! the API and tests can each wire their own instance. Every operation is
//! atomic: either all of its writes commit or none do.

pub mod error;
pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use query::{DashboardSummary, MovementWithProduct};
pub use r#trait::InventoryStore;

#[cfg(test)]
mod integration_tests;
