// src/models/revoked_token.rs

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A blacklisted token, identified by its `jti` claim. Kept until the token
/// would have expired anyway.
#[derive(Debug, Clone, FromRow)]
pub struct RevokedToken {
  pub jti: Uuid,
  pub expires_at: DateTime<Utc>,
  pub revoked_at: DateTime<Utc>,
}
