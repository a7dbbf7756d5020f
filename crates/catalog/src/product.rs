use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{DomainError, DomainResult, ProductId};

/// Catalog product record.
///
/// `stock` is the running on-hand counter. It is adjusted by the movement
/// ledger and may be overwritten directly through [`ProductPatch`] as a
/// correction; both paths keep it non-negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Prices in the smallest currency unit (cents).
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unvalidated field set for product creation, as it arrives from the boundary.
#[derive(Debug, Clone, Default)]
pub struct ProductFields {
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub cost_price_cents: i64,
    pub sale_price_cents: i64,
    pub stock: i64,
}

/// Unvalidated field set for a partial product update.
///
/// `None` means "keep the current value". For the image reference that is the
/// only supported no-op: there is no clear sentinel, a blank value also keeps
/// the current image.
#[derive(Debug, Clone, Default)]
pub struct PatchFields {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub cost_price_cents: Option<i64>,
    pub sale_price_cents: Option<i64>,
    pub stock: Option<i64>,
}

/// Validated input for creating a product.
///
/// Construction normalises optional text fields (trimmed, blank → `None`)
/// and rejects an empty name, negative prices, and negative stock, so a
/// draft that exists is safe to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    name: String,
    sku: Option<String>,
    category: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    cost_price_cents: i64,
    sale_price_cents: i64,
    stock: i64,
}

impl ProductDraft {
    pub fn new(fields: ProductFields) -> DomainResult<Self> {
        Ok(Self {
            name: require_name(&fields.name)?,
            sku: normalize_optional(fields.sku),
            category: normalize_optional(fields.category),
            description: normalize_optional(fields.description),
            image_url: normalize_optional(fields.image_url),
            cost_price_cents: check_price("cost price", fields.cost_price_cents)?,
            sale_price_cents: check_price("sale price", fields.sale_price_cents)?,
            stock: check_stock(fields.stock)?,
        })
    }

    /// Materialise the draft as a stored product with server-assigned
    /// identity and timestamps.
    pub fn into_product(self, id: ProductId, now: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            sku: self.sku,
            category: self.category,
            description: self.description,
            image_url: self.image_url,
            cost_price_cents: self.cost_price_cents,
            sale_price_cents: self.sale_price_cents,
            stock: self.stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated partial update.
///
/// Omitted fields keep their current value. Provided optional text fields
/// are normalised, so a blank SKU/category/description clears the field —
/// except the image reference, which is only ever replaced by a non-blank
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPatch {
    name: Option<String>,
    sku: Option<Option<String>>,
    category: Option<Option<String>>,
    description: Option<Option<String>>,
    image_url: Option<String>,
    cost_price_cents: Option<i64>,
    sale_price_cents: Option<i64>,
    stock: Option<i64>,
}

impl ProductPatch {
    pub fn new(fields: PatchFields) -> DomainResult<Self> {
        let name = match fields.name {
            Some(name) => Some(require_name(&name)?),
            None => None,
        };

        Ok(Self {
            name,
            sku: fields.sku.map(|v| normalize_optional(Some(v))),
            category: fields.category.map(|v| normalize_optional(Some(v))),
            description: fields.description.map(|v| normalize_optional(Some(v))),
            image_url: normalize_optional(fields.image_url),
            cost_price_cents: fields
                .cost_price_cents
                .map(|c| check_price("cost price", c))
                .transpose()?,
            sale_price_cents: fields
                .sale_price_cents
                .map(|c| check_price("sale price", c))
                .transpose()?,
            stock: fields.stock.map(check_stock).transpose()?,
        })
    }

    /// Merge the patch into an existing product, refreshing `updated_at`.
    pub fn apply_to(&self, mut product: Product, now: DateTime<Utc>) -> Product {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(sku) = &self.sku {
            product.sku = sku.clone();
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(image_url) = &self.image_url {
            product.image_url = Some(image_url.clone());
        }
        if let Some(cents) = self.cost_price_cents {
            product.cost_price_cents = cents;
        }
        if let Some(cents) = self.sale_price_cents {
            product.sale_price_cents = cents;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        product.updated_at = now;
        product
    }
}

fn require_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(name.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_price(field: &str, cents: i64) -> DomainResult<i64> {
    if cents < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(cents)
}

fn check_stock(stock: i64) -> DomainResult<i64> {
    if stock < 0 {
        return Err(DomainError::validation("stock cannot be negative"));
    }
    Ok(stock)
}
