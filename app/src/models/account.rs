// src/models/account.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Which kind of account a session belongs to. Sent as `type` by clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "account_role_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
  User,
  Admin,
}

impl AccountRole {
  pub fn as_str(self) -> &'static str {
    match self {
      AccountRole::User => "user",
      AccountRole::Admin => "admin",
    }
  }
}

impl std::fmt::Display for AccountRole {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Account {
  pub id: Uuid,
  #[serde(rename = "type")]
  pub role: AccountRole,
  pub email: String,
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub mobile: Option<String>,
  pub username: Option<String>,
  #[serde(skip_serializing)]
  pub reset_otp: Option<String>,
  #[serde(skip_serializing)]
  pub reset_otp_expires_at: Option<DateTime<Utc>>,
  #[serde(skip_serializing)]
  pub reset_verified_until: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Account {
  /// Name used in email greetings: first name for users, username for admins.
  pub fn display_name(&self) -> String {
    self
      .first_name
      .clone()
      .or_else(|| self.username.clone())
      .unwrap_or_else(|| self.email.clone())
  }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub role: AccountRole,
  pub email: String,
  pub password_hash: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub mobile: Option<String>,
  pub username: Option<String>,
}
