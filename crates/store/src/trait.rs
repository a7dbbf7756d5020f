//! The inventory store boundary.
//!
//! One handle serves three consumers: the product registry (catalog CRUD),
//! the movement ledger (the only writer of movement rows and the sole
//! authority for movement-driven stock changes), and the read-only query
//! surface (search, history, dashboard).

use async_trait::async_trait;

use stockroom_catalog::{Product, ProductDraft, ProductPatch};
use stockroom_core::{MovementId, ProductId};
use stockroom_ledger::{MovementType, RecordMovement, StockMovement};

use crate::error::StoreResult;
use crate::query::{DashboardSummary, MovementWithProduct};

/// Transactional store shared by the registry, the ledger, and the queries.
///
/// Implementations must guarantee two things about stock-mutating methods
/// (`record_movement`, `reverse_movement`, `update_product`):
///
/// - **Atomicity**: the product row and the movement row change together or
///   not at all; a failed invariant check leaves both untouched.
/// - **Serialisation**: two concurrent calls against the same product never
///   both observe the same pre-update stock; the second serialises after the
///   first or fails with a storage conflict for the caller to retry.
#[async_trait]
pub trait InventoryStore: Send + Sync + 'static {
    // --- product registry ---

    /// Insert a new product, returning it with generated id and timestamps.
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product>;

    /// Apply a partial update; omitted fields keep their current value.
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product>;

    /// Remove a product. Blocked with a conflict while movements reference it.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>>;

    /// Full catalog, newest first.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;

    /// Case-insensitive substring search over name, SKU, category, and
    /// description; a blank query returns the whole catalog, ordered by name.
    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>>;

    // --- movement ledger ---

    /// Record a movement and adjust the owning product's stock in one
    /// transaction. Rejects the whole operation when the resulting stock
    /// would be negative.
    async fn record_movement(&self, cmd: RecordMovement) -> StoreResult<StockMovement>;

    /// Undo a movement's effect against the product's *current* stock and
    /// delete its row in one transaction. Rejects when the compensating
    /// delta would drive stock negative.
    async fn reverse_movement(&self, id: MovementId) -> StoreResult<()>;

    // --- read-only queries ---

    /// Movement history, newest first, optionally filtered by type.
    async fn list_movements(
        &self,
        filter: Option<MovementType>,
    ) -> StoreResult<Vec<MovementWithProduct>>;

    /// Most recent movements, newest first.
    async fn recent_movements(&self, limit: i64) -> StoreResult<Vec<MovementWithProduct>>;

    /// Aggregate totals plus the ten most recent movements.
    async fn dashboard_summary(&self) -> StoreResult<DashboardSummary>;
}
