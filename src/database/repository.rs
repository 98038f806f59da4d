use crate::database::error::DbResult;
use crate::payments::types::{Order, StoredCardToken};
use async_trait::async_trait;
use uuid::Uuid;

/// Order storage owned by the surrounding store.
/// The gateway only reads orders and writes back status and transaction id.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Find an order by its ID
    async fn find_by_id(&self, id: &str) -> DbResult<Option<Order>>;

    /// Insert or update an order
    async fn save(&self, order: &Order) -> DbResult<()>;

    /// Reserve stock for the order's items; calling it twice reserves once
    async fn reduce_stock_levels(&self, order_id: &str) -> DbResult<()>;

    /// Check if an order exists by ID
    async fn exists(&self, id: &str) -> DbResult<bool> {
        match self.find_by_id(id).await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Saved card tokens
#[async_trait]
pub trait CardTokenRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<StoredCardToken>>;

    /// All tokens a customer saved, newest first
    async fn find_by_user_id(&self, user_id: &str) -> DbResult<Vec<StoredCardToken>>;

    async fn insert(&self, token: &StoredCardToken) -> DbResult<StoredCardToken>;
}
