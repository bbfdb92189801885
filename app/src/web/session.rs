// src/web/session.rs

//! Cookie-based sessions.
//!
//! A request is authenticated by its `token` (access) cookie. When that is
//! missing or expired, a valid and unrevoked `refreshToken` cookie is used to
//! mint a new access token; the new cookie is stashed in the request
//! extensions and attached to the response by [`attach_refreshed_cookie`].

use crate::errors::AppError;
use crate::models::AccountRole;
use crate::services::token_service::{Claims, TokenError, TokenKind};
use crate::state::AppState;
use crate::web::cookies::{token_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::{web, FromRequest, HttpMessage, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
  pub account_id: Uuid,
  pub email: String,
  pub role: AccountRole,
}

impl From<Claims> for Session {
  fn from(claims: Claims) -> Self {
    Self {
      account_id: claims.sub,
      email: claims.email,
      role: claims.role,
    }
  }
}

/// Access cookie minted during this request from the refresh token.
#[derive(Clone)]
pub struct RefreshedAccessCookie(pub Cookie<'static>);

pub(crate) fn app_state(req: &HttpRequest) -> Result<AppState, AppError> {
  req
    .app_data::<web::Data<AppState>>()
    .map(|data| data.get_ref().clone())
    .ok_or_else(|| AppError::Internal("Application state is not configured".to_string()))
}

/// Authenticates the request and, when `required` is set, checks the role.
pub async fn authenticate(req: &HttpRequest, state: &AppState, required: Option<AccountRole>) -> Result<Session, AppError> {
  let access = req.cookie(ACCESS_COOKIE).map(|c| c.value().to_string());
  let refresh = req.cookie(REFRESH_COOKIE).map(|c| c.value().to_string());

  if access.is_none() && refresh.is_none() {
    return Err(AppError::Forbidden("Access denied. No tokens provided.".to_string()));
  }

  let claims = match access.as_deref().map(|t| state.tokens.verify(TokenKind::Access, t)) {
    Some(Ok(claims)) => {
      if state.store.is_token_revoked(claims.jti).await? {
        warn!(jti = %claims.jti, "Revoked access token presented.");
        return Err(AppError::Auth("Invalid or expired token.".to_string()));
      }
      claims
    }
    Some(Err(TokenError::Expired)) | None => refresh_access(req, state, refresh.as_deref()).await?,
    Some(Err(e)) => {
      debug!(error = %e, "Access token rejected.");
      return Err(AppError::Forbidden("Invalid or expired token.".to_string()));
    }
  };

  if let Some(role) = required {
    if claims.role != role {
      warn!(account_id = %claims.sub, have = %claims.role, need = %role, "Role check failed.");
      return Err(AppError::Forbidden("Forbidden: Insufficient role.".to_string()));
    }
  }
  Ok(Session::from(claims))
}

async fn refresh_access(req: &HttpRequest, state: &AppState, refresh: Option<&str>) -> Result<Claims, AppError> {
  let refresh = refresh.ok_or_else(|| AppError::Auth("Session expired. Please log in again.".to_string()))?;
  let refresh_claims = verified_refresh_claims(state, refresh).await?;

  let issued = state.tokens.issue(
    TokenKind::Access,
    refresh_claims.sub,
    &refresh_claims.email,
    refresh_claims.role,
  )?;
  let cookie = token_cookie(
    ACCESS_COOKIE,
    issued.token,
    state.tokens.ttl(TokenKind::Access),
    state.config.cookie_secure,
  );
  req.extensions_mut().insert(RefreshedAccessCookie(cookie));
  info!(account_id = %refresh_claims.sub, "Access token refreshed from refresh cookie.");
  Ok(issued.claims)
}

/// Verifies a refresh token and checks it against the blacklist.
pub async fn verified_refresh_claims(state: &AppState, refresh: &str) -> Result<Claims, AppError> {
  let claims = state.tokens.verify(TokenKind::Refresh, refresh).map_err(|e| {
    debug!(error = %e, "Refresh token rejected.");
    AppError::Auth("Invalid or expired refresh token.".to_string())
  })?;
  if state.store.is_token_revoked(claims.jti).await? {
    warn!(jti = %claims.jti, "Revoked refresh token presented.");
    return Err(AppError::Auth("Invalid or expired refresh token.".to_string()));
  }
  Ok(claims)
}

/// Copies a refreshed access cookie from the request onto the response.
pub async fn attach_refreshed_cookie(
  req: ServiceRequest,
  next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
  let mut res = next.call(req).await?;
  let refreshed = res.request().extensions().get::<RefreshedAccessCookie>().cloned();
  if let Some(RefreshedAccessCookie(cookie)) = refreshed {
    res.response_mut().add_cookie(&cookie)?;
  }
  Ok(res)
}

macro_rules! session_extractor {
  ($(#[$doc:meta])* $name:ident, $role:expr) => {
    $(#[$doc])*
    #[derive(Debug, Clone)]
    pub struct $name(pub Session);

    impl FromRequest for $name {
      type Error = AppError;
      type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

      fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
          let state = app_state(&req)?;
          authenticate(&req, &state, $role).await.map($name)
        })
      }
    }
  };
}

session_extractor!(
  /// A signed-in shopper.
  UserSession,
  Some(AccountRole::User)
);
session_extractor!(
  /// A signed-in administrator.
  AdminSession,
  Some(AccountRole::Admin)
);
session_extractor!(
  /// Any signed-in account.
  AnySession,
  None
);
