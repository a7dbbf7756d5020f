use serde::Deserialize;

use stockroom_catalog::{PatchFields, Product, ProductDraft, ProductFields, ProductPatch};
use stockroom_core::{DomainResult, ProductId};
use stockroom_ledger::{MovementType, RecordMovement, StockMovement};
use stockroom_store::{DashboardSummary, MovementWithProduct};

// -------------------------
// Request DTOs
// -------------------------
//
// Each request converts into a validated domain command before it reaches
// the store; unvalidated primitives never cross that boundary.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub cost_price_cents: i64,
    #[serde(default)]
    pub sale_price_cents: i64,
    #[serde(default)]
    pub stock: i64,
}

impl CreateProductRequest {
    pub fn into_draft(self) -> DomainResult<ProductDraft> {
        ProductDraft::new(ProductFields {
            name: self.name,
            sku: self.sku,
            category: self.category,
            description: self.description,
            image_url: self.image_url,
            cost_price_cents: self.cost_price_cents,
            sale_price_cents: self.sale_price_cents,
            stock: self.stock,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    /// Omitted means "keep the current image"; there is no clear sentinel.
    pub image_url: Option<String>,
    pub cost_price_cents: Option<i64>,
    pub sale_price_cents: Option<i64>,
    pub stock: Option<i64>,
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> DomainResult<ProductPatch> {
        ProductPatch::new(PatchFields {
            name: self.name,
            sku: self.sku,
            category: self.category,
            description: self.description,
            image_url: self.image_url,
            cost_price_cents: self.cost_price_cents,
            sale_price_cents: self.sale_price_cents,
            stock: self.stock,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementRequest {
    pub product_id: String,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub qty: i64,
    pub reason: Option<String>,
}

impl RecordMovementRequest {
    pub fn into_command(self) -> DomainResult<RecordMovement> {
        let product_id: ProductId = self.product_id.parse()?;
        let movement_type: MovementType = self.movement_type.parse()?;
        RecordMovement::new(product_id, movement_type, self.qty, self.reason)
    }
}

#[derive(Debug, Deserialize)]
pub struct MovementHistoryParams {
    /// Optional movement type filter, "IN" or "OUT".
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(p: &Product) -> serde_json::Value {
    serde_json::json!({
        "id": p.id.to_string(),
        "name": p.name,
        "sku": p.sku,
        "category": p.category,
        "description": p.description,
        "imageUrl": p.image_url,
        "costPriceCents": p.cost_price_cents,
        "salePriceCents": p.sale_price_cents,
        "stock": p.stock,
        "createdAt": p.created_at.to_rfc3339(),
        "updatedAt": p.updated_at.to_rfc3339(),
    })
}

pub fn movement_to_json(m: &StockMovement) -> serde_json::Value {
    serde_json::json!({
        "id": m.id.to_string(),
        "productId": m.product_id.to_string(),
        "type": m.movement_type.as_str(),
        "qty": m.qty,
        "reason": m.reason,
        "createdAt": m.created_at.to_rfc3339(),
    })
}

pub fn movement_with_product_to_json(m: &MovementWithProduct) -> serde_json::Value {
    let mut value = movement_to_json(&m.movement);
    value["productName"] = serde_json::json!(m.product_name);
    value
}

pub fn summary_to_json(s: &DashboardSummary) -> serde_json::Value {
    serde_json::json!({
        "totalProducts": s.total_products,
        "totalStock": s.total_stock,
        "recentMovements": s
            .recent_movements
            .iter()
            .map(movement_with_product_to_json)
            .collect::<Vec<_>>(),
    })
}
