use crate::database::error::DatabaseError;
use crate::database::repository::CardTokenRepository;
use crate::payments::types::StoredCardToken;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed card token storage
pub struct PgCardTokenRepository {
    pool: PgPool,
}

impl PgCardTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CardTokenRepository for PgCardTokenRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredCardToken>, DatabaseError> {
        sqlx::query_as::<_, StoredCardToken>(
            "SELECT id, token, gateway_id, card_type, last4, expiry_month, expiry_year, user_id, created_at
             FROM card_tokens WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<StoredCardToken>, DatabaseError> {
        sqlx::query_as::<_, StoredCardToken>(
            "SELECT id, token, gateway_id, card_type, last4, expiry_month, expiry_year, user_id, created_at
             FROM card_tokens
             WHERE user_id = $1
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn insert(&self, token: &StoredCardToken) -> Result<StoredCardToken, DatabaseError> {
        sqlx::query_as::<_, StoredCardToken>(
            "INSERT INTO card_tokens (id, token, gateway_id, card_type, last4, expiry_month, expiry_year, user_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, token, gateway_id, card_type, last4, expiry_month, expiry_year, user_id, created_at",
        )
        .bind(token.id)
        .bind(&token.token)
        .bind(&token.gateway_id)
        .bind(&token.card_type)
        .bind(&token.last4)
        .bind(&token.expiry_month)
        .bind(&token.expiry_year)
        .bind(&token.user_id)
        .bind(token.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
