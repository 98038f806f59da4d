//! In-memory order and card token stores
//!
//! Backed by `Arc<RwLock<HashMap<..>>>`; cloning shares the same data.
//! Used by the test suite and when the `database` feature is off.

use crate::database::error::{DatabaseError, DatabaseErrorKind};
use crate::database::repository::{CardTokenRepository, OrderRepository};
use crate::payments::types::{Order, StoredCardToken};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default, Clone)]
pub struct InMemoryOrderRepository {
    orders: Arc<RwLock<HashMap<String, Order>>>,
    stock_reduced: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether stock was reserved for the order
    pub async fn stock_reduced(&self, order_id: &str) -> bool {
        self.stock_reduced.read().await.contains(order_id)
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Order>, DatabaseError> {
        let orders = self.orders.read().await;
        Ok(orders.get(id).cloned())
    }

    async fn save(&self, order: &Order) -> Result<(), DatabaseError> {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn reduce_stock_levels(&self, order_id: &str) -> Result<(), DatabaseError> {
        if !self.orders.read().await.contains_key(order_id) {
            return Err(DatabaseError::not_found("Order", order_id));
        }
        self.stock_reduced.write().await.insert(order_id.to_string());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryCardTokenRepository {
    tokens: Arc<RwLock<HashMap<Uuid, StoredCardToken>>>,
}

impl InMemoryCardTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl CardTokenRepository for InMemoryCardTokenRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredCardToken>, DatabaseError> {
        Ok(self.tokens.read().await.get(&id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<StoredCardToken>, DatabaseError> {
        let tokens = self.tokens.read().await;
        let mut found: Vec<StoredCardToken> = tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn insert(&self, token: &StoredCardToken) -> Result<StoredCardToken, DatabaseError> {
        let mut tokens = self.tokens.write().await;
        if tokens.values().any(|t| t.token == token.token) {
            return Err(DatabaseError::new(
                DatabaseErrorKind::UniqueConstraintViolation {
                    column: "token".to_string(),
                    value: token.token.clone(),
                },
            ));
        }
        tokens.insert(token.id, token.clone());
        Ok(token.clone())
    }
}
