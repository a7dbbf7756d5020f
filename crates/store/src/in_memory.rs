//! In-memory inventory store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use stockroom_catalog::{Product, ProductDraft, ProductPatch};
use stockroom_core::{DomainError, MovementId, ProductId};
use stockroom_ledger::{self as ledger, MovementType, RecordMovement, StockMovement};

use crate::error::{StoreError, StoreResult};
use crate::query::{DashboardSummary, MovementWithProduct};
use crate::r#trait::InventoryStore;

#[derive(Debug, Default)]
struct State {
    products: HashMap<ProductId, Product>,
    movements: HashMap<MovementId, StockMovement>,
}

/// In-memory store.
///
/// Intended for tests/dev. Every operation runs under one exclusive lock,
/// which makes it trivially atomic and serialises concurrent stock
/// mutations, matching the contract the Postgres store provides with row
/// locks.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    state: RwLock<State>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn join_product_name(state: &State, movement: &StockMovement) -> MovementWithProduct {
    let product_name = state
        .products
        .get(&movement.product_id)
        .map(|p| p.name.clone())
        .unwrap_or_default();
    MovementWithProduct {
        movement: movement.clone(),
        product_name,
    }
}

/// Newest first; UUIDv7 ids break timestamp ties in insertion order.
fn sort_newest_first(movements: &mut [MovementWithProduct]) {
    movements.sort_by(|a, b| {
        b.movement
            .created_at
            .cmp(&a.movement.created_at)
            .then_with(|| b.movement.id.as_uuid().cmp(a.movement.id.as_uuid()))
    });
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        let product = draft.into_product(ProductId::new(), Utc::now());
        let mut state = self.write()?;
        state.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let mut state = self.write()?;
        let current = state
            .products
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;
        let updated = patch.apply_to(current, Utc::now());
        state.products.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.products.contains_key(&id) {
            return Err(DomainError::not_found().into());
        }
        if state.movements.values().any(|m| m.product_id == id) {
            return Err(DomainError::conflict("product has recorded movements").into());
        }
        state.products.remove(&id);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let state = self.read()?;
        let mut products: Vec<Product> = state.products.values().cloned().collect();
        products.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(products)
    }

    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        let needle = query.trim().to_lowercase();
        let state = self.read()?;
        let mut products: Vec<Product> = state
            .products
            .values()
            .filter(|p| {
                if needle.is_empty() {
                    return true;
                }
                let field_matches = |field: &Option<String>| {
                    field
                        .as_deref()
                        .is_some_and(|v| v.to_lowercase().contains(&needle))
                };
                p.name.to_lowercase().contains(&needle)
                    || field_matches(&p.sku)
                    || field_matches(&p.category)
                    || field_matches(&p.description)
            })
            .cloned()
            .collect();
        products.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(products)
    }

    async fn record_movement(&self, cmd: RecordMovement) -> StoreResult<StockMovement> {
        let mut state = self.write()?;
        let product = state
            .products
            .get_mut(&cmd.product_id())
            .ok_or(DomainError::NotFound)?;

        // Invariant check happens before any write; on failure the product
        // row and the movement map are both untouched.
        let next = ledger::next_stock(product.stock, cmd.movement_type(), cmd.qty())?;

        let now = Utc::now();
        product.stock = next;
        product.updated_at = now;

        let movement = cmd.into_movement(MovementId::new(), now);
        state.movements.insert(movement.id, movement.clone());
        Ok(movement)
    }

    async fn reverse_movement(&self, id: MovementId) -> StoreResult<()> {
        let mut state = self.write()?;
        let movement = state
            .movements
            .get(&id)
            .cloned()
            .ok_or(DomainError::NotFound)?;
        let product = state
            .products
            .get_mut(&movement.product_id)
            .ok_or(DomainError::NotFound)?;

        let next = ledger::reversed_stock(product.stock, &movement)?;

        product.stock = next;
        product.updated_at = Utc::now();
        state.movements.remove(&id);
        Ok(())
    }

    async fn list_movements(
        &self,
        filter: Option<MovementType>,
    ) -> StoreResult<Vec<MovementWithProduct>> {
        let state = self.read()?;
        let mut movements: Vec<MovementWithProduct> = state
            .movements
            .values()
            .filter(|m| filter.is_none_or(|t| m.movement_type == t))
            .map(|m| join_product_name(&state, m))
            .collect();
        sort_newest_first(&mut movements);
        Ok(movements)
    }

    async fn recent_movements(&self, limit: i64) -> StoreResult<Vec<MovementWithProduct>> {
        let mut movements = self.list_movements(None).await?;
        movements.truncate(limit.max(0) as usize);
        Ok(movements)
    }

    async fn dashboard_summary(&self) -> StoreResult<DashboardSummary> {
        let (total_products, total_stock) = {
            let state = self.read()?;
            (
                state.products.len() as i64,
                state.products.values().map(|p| p.stock).sum(),
            )
        };
        let recent_movements = self.recent_movements(10).await?;
        Ok(DashboardSummary {
            total_products,
            total_stock,
            recent_movements,
        })
    }
}
