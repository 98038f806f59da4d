use crate::database::error::DatabaseError;
use crate::database::repository::OrderRepository;
use crate::database::transaction::DatabaseTransaction;
use crate::payments::types::{Order, OrderItem, OrderStatus};
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
struct OrderRow {
    id: String,
    order_key: String,
    customer_id: Option<String>,
    total: i64,
    currency: String,
    status: String,
    transaction_id: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct OrderItemRow {
    name: String,
    quantity: i32,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItemRow>) -> Result<Order, DatabaseError> {
        let status: OrderStatus = self
            .status
            .parse()
            .map_err(|e| DatabaseError::corrupted("Order", format!("{}", e)).with_context(self.id.clone()))?;

        let items = items
            .into_iter()
            .map(|row| {
                let quantity = u32::try_from(row.quantity).map_err(|_| {
                    DatabaseError::corrupted("OrderItem", format!("negative quantity {}", row.quantity))
                })?;
                Ok(OrderItem {
                    name: row.name,
                    quantity,
                })
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        Ok(Order {
            id: self.id,
            order_key: self.order_key,
            customer_id: self.customer_id,
            total: self.total,
            currency: self.currency,
            status,
            transaction_id: self.transaction_id,
            items,
        })
    }
}

/// Postgres-backed order storage
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, DatabaseError> {
        let row = sqlx::query_as::<_, OrderRow>(
            "SELECT id, order_key, customer_id, total, currency, status, transaction_id
             FROM orders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT name, quantity FROM order_items WHERE order_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        row.into_order(items).map(Some)
    }

    async fn save(&self, order: &Order) -> Result<(), DatabaseError> {
        let mut tx = DatabaseTransaction::begin(&self.pool).await?;

        sqlx::query(
            "INSERT INTO orders (id, order_key, customer_id, total, currency, status, transaction_id, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
             ON CONFLICT (id) DO UPDATE
             SET status = EXCLUDED.status,
                 transaction_id = EXCLUDED.transaction_id,
                 updated_at = NOW()",
        )
        .bind(&order.id)
        .bind(&order.order_key)
        .bind(&order.customer_id)
        .bind(order.total)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(&order.transaction_id)
        .execute(tx.conn()?)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        sqlx::query("DELETE FROM order_items WHERE order_id = $1")
            .bind(&order.id)
            .execute(tx.conn()?)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (order_id, position, name, quantity) VALUES ($1, $2, $3, $4)",
            )
            .bind(&order.id)
            .bind(position as i32)
            .bind(&item.name)
            .bind(item.quantity as i32)
            .execute(tx.conn()?)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        }

        tx.commit().await
    }

    async fn reduce_stock_levels(&self, order_id: &str) -> Result<(), DatabaseError> {
        let mut tx = DatabaseTransaction::begin(&self.pool).await?;

        // Flip the flag first so a second call is a no-op
        let flagged = sqlx::query(
            "UPDATE orders SET stock_reduced = true WHERE id = $1 AND stock_reduced = false",
        )
        .bind(order_id)
        .execute(tx.conn()?)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        if flagged.rows_affected() == 0 {
            return tx.rollback().await;
        }

        sqlx::query(
            "UPDATE products p
             SET stock_quantity = p.stock_quantity - oi.quantity
             FROM order_items oi
             WHERE oi.order_id = $1 AND oi.name = p.name AND p.manage_stock",
        )
        .bind(order_id)
        .execute(tx.conn()?)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        tx.commit().await
    }
}
