// src/services/token_service.rs

//! HS256 JSON Web Tokens for access and refresh sessions.
//!
//! Access and refresh tokens are signed with different secrets, so a token of
//! one kind never verifies as the other.

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::AccountRole;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use tracing::{debug, instrument};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Access,
  Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub email: String,
  #[serde(rename = "type")]
  pub role: AccountRole,
  pub jti: Uuid,
  pub iat: i64,
  pub exp: i64,
}

impl Claims {
  pub fn expires_at(&self) -> DateTime<Utc> {
    Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
  }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
  #[error("malformed token")]
  Malformed,
  #[error("bad token signature")]
  BadSignature,
  #[error("token expired")]
  Expired,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
  pub token: String,
  pub claims: Claims,
}

pub struct TokenService {
  access_secret: Vec<u8>,
  refresh_secret: Vec<u8>,
  access_ttl_secs: i64,
  refresh_ttl_secs: i64,
}

impl std::fmt::Debug for TokenService {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenService")
      .field("access_ttl_secs", &self.access_ttl_secs)
      .field("refresh_ttl_secs", &self.refresh_ttl_secs)
      .finish_non_exhaustive()
  }
}

impl TokenService {
  pub fn new(config: &AppConfig) -> Self {
    Self {
      access_secret: config.jwt_secret.as_bytes().to_vec(),
      refresh_secret: config.jwt_refresh_secret.as_bytes().to_vec(),
      access_ttl_secs: config.access_token_ttl_secs,
      refresh_ttl_secs: config.refresh_token_ttl_secs,
    }
  }

  pub fn ttl(&self, kind: TokenKind) -> i64 {
    match kind {
      TokenKind::Access => self.access_ttl_secs,
      TokenKind::Refresh => self.refresh_ttl_secs,
    }
  }

  fn secret(&self, kind: TokenKind) -> &[u8] {
    match kind {
      TokenKind::Access => &self.access_secret,
      TokenKind::Refresh => &self.refresh_secret,
    }
  }

  fn mac(&self, kind: TokenKind) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(self.secret(kind))
      .map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))
  }

  #[instrument(name = "token_service::issue", skip(self, email), fields(kind = ?kind, account_id = %account_id))]
  pub fn issue(&self, kind: TokenKind, account_id: Uuid, email: &str, role: AccountRole) -> Result<IssuedToken, AppError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
      sub: account_id,
      email: email.to_string(),
      role,
      jti: Uuid::new_v4(),
      iat: now,
      exp: now + self.ttl(kind),
    };
    let payload = serde_json::to_vec(&claims)
      .map_err(|e| AppError::Internal(format!("Failed to encode token claims: {}", e)))?;

    let signing_input = format!(
      "{}.{}",
      URL_SAFE_NO_PAD.encode(HEADER),
      URL_SAFE_NO_PAD.encode(payload)
    );
    let mut mac = self.mac(kind)?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    debug!(jti = %claims.jti, "Issued token.");
    Ok(IssuedToken {
      token: format!("{}.{}", signing_input, signature),
      claims,
    })
  }

  /// Checks the signature and returns the claims without looking at `exp`.
  pub fn decode(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
      return Err(TokenError::Malformed);
    };

    let signature = URL_SAFE_NO_PAD.decode(signature).map_err(|_| TokenError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(self.secret(kind)).map_err(|_| TokenError::BadSignature)?;
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).map_err(|_| TokenError::BadSignature)?;

    let header = URL_SAFE_NO_PAD.decode(header).map_err(|_| TokenError::Malformed)?;
    let header: serde_json::Value = serde_json::from_slice(&header).map_err(|_| TokenError::Malformed)?;
    if header.get("alg").and_then(|v| v.as_str()) != Some("HS256") {
      return Err(TokenError::Malformed);
    }

    let payload = URL_SAFE_NO_PAD.decode(payload).map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)
  }

  /// Checks the signature and the expiry.
  pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
    let claims = self.decode(kind, token)?;
    if claims.exp <= Utc::now().timestamp() {
      return Err(TokenError::Expired);
    }
    Ok(claims)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn service() -> TokenService {
    TokenService::new(&AppConfig::with_secrets("access-secret", "refresh-secret"))
  }

  #[test]
  fn issued_tokens_verify_with_their_own_kind_only() {
    let tokens = service();
    let id = Uuid::new_v4();
    let issued = tokens.issue(TokenKind::Access, id, "a@b.c", AccountRole::User).unwrap();

    let claims = tokens.verify(TokenKind::Access, &issued.token).unwrap();
    assert_eq!(claims.sub, id);
    assert_eq!(claims.role, AccountRole::User);
    assert_eq!(claims.exp - claims.iat, 2 * 60 * 60);

    assert_eq!(
      tokens.verify(TokenKind::Refresh, &issued.token),
      Err(TokenError::BadSignature)
    );
  }

  #[test]
  fn tampered_payload_is_rejected() {
    let tokens = service();
    let issued = tokens.issue(TokenKind::Access, Uuid::new_v4(), "a@b.c", AccountRole::User).unwrap();
    let mut forged = issued.claims.clone();
    forged.role = AccountRole::Admin;
    let parts: Vec<&str> = issued.token.split('.').collect();
    let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
    let token = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

    assert_eq!(tokens.verify(TokenKind::Access, &token), Err(TokenError::BadSignature));
  }

  #[test]
  fn expired_tokens_still_decode() {
    let mut config = AppConfig::with_secrets("access-secret", "refresh-secret");
    config.refresh_token_ttl_secs = -10;
    let tokens = TokenService::new(&config);
    let issued = tokens.issue(TokenKind::Refresh, Uuid::new_v4(), "a@b.c", AccountRole::Admin).unwrap();

    assert_eq!(tokens.verify(TokenKind::Refresh, &issued.token), Err(TokenError::Expired));
    assert_eq!(tokens.decode(TokenKind::Refresh, &issued.token).unwrap().jti, issued.claims.jti);
  }

  #[test]
  fn garbage_is_malformed() {
    assert_eq!(service().verify(TokenKind::Access, "abc"), Err(TokenError::Malformed));
    assert_eq!(service().verify(TokenKind::Access, "a.b.c.d"), Err(TokenError::Malformed));
  }
}
