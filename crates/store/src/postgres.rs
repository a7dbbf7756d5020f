//! Postgres-backed inventory store.
//!
//! Every stock-mutating operation runs in one transaction and takes a
//! `SELECT ... FOR UPDATE` lock on the product row, so two concurrent
//! mutations against the same product serialise instead of both reading the
//! same pre-update stock. Validation failures roll the transaction back
//! before any write; CHECK constraints and the movement foreign key back the
//! invariants at the database level.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockroom_catalog::{Product, ProductDraft, ProductPatch};
use stockroom_core::{DomainError, MovementId, ProductId};
use stockroom_ledger::{self as ledger, MovementType, RecordMovement, StockMovement};

use crate::error::{map_sqlx_error, StoreError, StoreResult};
use crate::query::{DashboardSummary, MovementWithProduct};
use crate::r#trait::InventoryStore;

/// Postgres inventory store over a shared connection pool.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to the given database URL.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to connect: {e}")))?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))
    }

    async fn rollback(tx: Transaction<'_, Postgres>, operation: &str) -> StoreResult<()> {
        tx.rollback()
            .await
            .map_err(|e| map_sqlx_error(operation, e))
    }

    /// Lock the product row and return its current stock, or `None` when the
    /// product does not exist.
    async fn lock_stock(
        tx: &mut Transaction<'_, Postgres>,
        operation: &str,
        product_id: ProductId,
    ) -> StoreResult<Option<i64>> {
        let row = sqlx::query("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
            .bind(product_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        row.map(|r| read_column(&r, "stock")).transpose()
    }

    async fn write_stock(
        tx: &mut Transaction<'_, Postgres>,
        operation: &str,
        product_id: ProductId,
        stock: i64,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE products SET stock = $2, updated_at = NOW() WHERE id = $1")
            .bind(product_id.as_uuid())
            .bind(stock)
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self, draft), err)]
    async fn create_product(&self, draft: ProductDraft) -> StoreResult<Product> {
        let product = draft.into_product(ProductId::new(), Utc::now());

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, category, description, image_url,
                cost_price_cents, sale_price_cents, stock, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.category)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(product.cost_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;

        Ok(product)
    }

    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    async fn update_product(&self, id: ProductId, patch: ProductPatch) -> StoreResult<Product> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        let row = sqlx::query(&format!("{PRODUCT_SELECT} WHERE id = $1 FOR UPDATE"))
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        let Some(row) = row else {
            Self::rollback(tx, "update_product").await?;
            return Err(DomainError::not_found().into());
        };

        let updated = patch.apply_to(product_from_row(&row)?, Utc::now());

        sqlx::query(
            r#"
            UPDATE products SET
                name = $2,
                sku = $3,
                category = $4,
                description = $5,
                image_url = $6,
                cost_price_cents = $7,
                sale_price_cents = $8,
                stock = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(updated.id.as_uuid())
        .bind(&updated.name)
        .bind(&updated.sku)
        .bind(&updated.category)
        .bind(&updated.description)
        .bind(&updated.image_url)
        .bind(updated.cost_price_cents)
        .bind(updated.sale_price_cents)
        .bind(updated.stock)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("update_product", e))?;

        Ok(updated)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        let row = sqlx::query("SELECT COUNT(*) AS movement_count FROM stock_movements WHERE product_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        let movement_count: i64 = read_column(&row, "movement_count")?;

        if movement_count > 0 {
            Self::rollback(tx, "delete_product").await?;
            return Err(DomainError::conflict("product has recorded movements").into());
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            Self::rollback(tx, "delete_product").await?;
            return Err(DomainError::not_found().into());
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn get_product(&self, id: ProductId) -> StoreResult<Option<Product>> {
        let row = sqlx::query(&format!("{PRODUCT_SELECT} WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;

        row.map(|r| product_from_row(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query(&format!("{PRODUCT_SELECT} ORDER BY created_at DESC, id DESC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn search_products(&self, query: &str) -> StoreResult<Vec<Product>> {
        let needle = query.trim();
        let pattern = format!("%{}%", escape_like(needle));

        let rows = sqlx::query(&format!(
            r#"
            {PRODUCT_SELECT}
            WHERE $1 = ''
                OR name ILIKE $2
                OR sku ILIKE $2
                OR category ILIKE $2
                OR description ILIKE $2
            ORDER BY LOWER(name) ASC
            "#
        ))
        .bind(needle)
        .bind(&pattern)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_products", e))?;

        rows.iter().map(product_from_row).collect()
    }

    #[instrument(
        skip(self, cmd),
        fields(product_id = %cmd.product_id(), movement_type = %cmd.movement_type(), qty = cmd.qty()),
        err
    )]
    async fn record_movement(&self, cmd: RecordMovement) -> StoreResult<StockMovement> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("record_movement", e))?;

        let Some(current) = Self::lock_stock(&mut tx, "record_movement", cmd.product_id()).await?
        else {
            Self::rollback(tx, "record_movement").await?;
            return Err(DomainError::not_found().into());
        };

        let next = match ledger::next_stock(current, cmd.movement_type(), cmd.qty()) {
            Ok(next) => next,
            Err(e) => {
                Self::rollback(tx, "record_movement").await?;
                return Err(e.into());
            }
        };

        Self::write_stock(&mut tx, "record_movement", cmd.product_id(), next).await?;

        let movement_id = MovementId::new();
        let row = sqlx::query(
            r#"
            INSERT INTO stock_movements (id, product_id, movement_type, qty, reason)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(movement_id.as_uuid())
        .bind(cmd.product_id().as_uuid())
        .bind(cmd.movement_type().as_str())
        .bind(cmd.qty())
        .bind(cmd.reason())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("record_movement", e))?;

        let created_at: DateTime<Utc> = read_column(&row, "created_at")?;
        let movement = cmd.into_movement(movement_id, created_at);

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("record_movement", e))?;

        Ok(movement)
    }

    #[instrument(skip(self), fields(movement_id = %id), err)]
    async fn reverse_movement(&self, id: MovementId) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("reverse_movement", e))?;

        let row = sqlx::query(
            r#"
            SELECT id, product_id, movement_type, qty, reason, created_at
            FROM stock_movements
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("reverse_movement", e))?;

        let Some(row) = row else {
            Self::rollback(tx, "reverse_movement").await?;
            return Err(DomainError::not_found().into());
        };
        let movement = movement_from_row(&row)?;

        let Some(current) =
            Self::lock_stock(&mut tx, "reverse_movement", movement.product_id).await?
        else {
            Self::rollback(tx, "reverse_movement").await?;
            return Err(DomainError::not_found().into());
        };

        let next = match ledger::reversed_stock(current, &movement) {
            Ok(next) => next,
            Err(e) => {
                Self::rollback(tx, "reverse_movement").await?;
                return Err(e.into());
            }
        };

        Self::write_stock(&mut tx, "reverse_movement", movement.product_id, next).await?;

        sqlx::query("DELETE FROM stock_movements WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("reverse_movement", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("reverse_movement", e))
    }

    #[instrument(skip(self), err)]
    async fn list_movements(
        &self,
        filter: Option<MovementType>,
    ) -> StoreResult<Vec<MovementWithProduct>> {
        let rows = sqlx::query(&format!(
            "{MOVEMENT_SELECT} WHERE $1::text IS NULL OR m.movement_type = $1 \
             ORDER BY m.created_at DESC, m.id DESC"
        ))
        .bind(filter.map(MovementType::as_str))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        rows.iter().map(movement_with_product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn recent_movements(&self, limit: i64) -> StoreResult<Vec<MovementWithProduct>> {
        let rows = sqlx::query(&format!(
            "{MOVEMENT_SELECT} ORDER BY m.created_at DESC, m.id DESC LIMIT $1"
        ))
        .bind(limit.max(0))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("recent_movements", e))?;

        rows.iter().map(movement_with_product_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn dashboard_summary(&self) -> StoreResult<DashboardSummary> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(stock), 0)::BIGINT AS total_stock
            FROM products
            "#,
        )
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("dashboard_summary", e))?;

        let total_products: i64 = read_column(&row, "total_products")?;
        let total_stock: i64 = read_column(&row, "total_stock")?;
        let recent_movements = self.recent_movements(10).await?;

        Ok(DashboardSummary {
            total_products,
            total_stock,
            recent_movements,
        })
    }
}

const PRODUCT_SELECT: &str = "SELECT id, name, sku, category, description, image_url, \
     cost_price_cents, sale_price_cents, stock, created_at, updated_at FROM products";

const MOVEMENT_SELECT: &str = "SELECT m.id, m.product_id, m.movement_type, m.qty, m.reason, \
     m.created_at, p.name AS product_name \
     FROM stock_movements m JOIN products p ON p.id = m.product_id";

fn read_column<'r, T>(row: &'r sqlx::postgres::PgRow, column: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(column)
        .map_err(|e| StoreError::Backend(format!("failed to read column '{column}': {e}")))
}

fn product_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<Product> {
    Ok(Product {
        id: ProductId::from_uuid(read_column(row, "id")?),
        name: read_column(row, "name")?,
        sku: read_column(row, "sku")?,
        category: read_column(row, "category")?,
        description: read_column(row, "description")?,
        image_url: read_column(row, "image_url")?,
        cost_price_cents: read_column(row, "cost_price_cents")?,
        sale_price_cents: read_column(row, "sale_price_cents")?,
        stock: read_column(row, "stock")?,
        created_at: read_column(row, "created_at")?,
        updated_at: read_column(row, "updated_at")?,
    })
}

fn movement_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<StockMovement> {
    let movement_type: String = read_column(row, "movement_type")?;
    let movement_type = movement_type
        .parse::<MovementType>()
        .map_err(|e| StoreError::Backend(format!("invalid movement_type in row: {e}")))?;

    Ok(StockMovement {
        id: MovementId::from_uuid(read_column(row, "id")?),
        product_id: ProductId::from_uuid(read_column(row, "product_id")?),
        movement_type,
        qty: read_column(row, "qty")?,
        reason: read_column(row, "reason")?,
        created_at: read_column(row, "created_at")?,
    })
}

fn movement_with_product_from_row(row: &sqlx::postgres::PgRow) -> StoreResult<MovementWithProduct> {
    Ok(MovementWithProduct {
        movement: movement_from_row(row)?,
        product_name: read_column(row, "product_name")?,
    })
}

/// Escape LIKE metacharacters so user input matches literally.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
