//! Read models served by the query surface.

use stockroom_ledger::StockMovement;

/// A movement joined with its product's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementWithProduct {
    pub movement: StockMovement,
    pub product_name: String,
}

/// Dashboard aggregates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub total_products: i64,
    /// Sum of stock counters across the catalog.
    pub total_stock: i64,
    pub recent_movements: Vec<MovementWithProduct>,
}
