//! `stockroom-ledger` — movement ledger domain slice.
//!
//! The reversible history of stock-affecting events and the arithmetic that
//! keeps a product's stock counter consistent with it. This crate is pure:
//! the store layer runs these decisions inside its transactions.

pub mod movement;

pub use movement::{next_stock, reversed_stock, MovementType, RecordMovement, StockMovement};
