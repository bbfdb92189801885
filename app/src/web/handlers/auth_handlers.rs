// src/web/handlers/auth_handlers.rs

//! Registration, sign-in, token refresh, logout and password recovery.
//! Shared by the user and admin scopes; the `type` field picks the account kind.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use stepflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};

use super::{normalize_email, required_role};
use crate::errors::{AppError, Result as AppResult};
use crate::models::AccountRole;
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::auth_service;
use crate::services::notifier::OutgoingEmail;
use crate::services::token_service::{TokenError, TokenKind};
use crate::state::AppState;
use crate::web::cookies::{removal_cookie, token_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::web::session::{authenticate, verified_refresh_claims, AnySession};

const OTP_TTL_MINUTES: i64 = 5;
const RESET_WINDOW_MINUTES: i64 = 10;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub email: String,
  pub password: String,
  pub mobile: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct AddAdminPayload {
  pub email: String,
  pub password: String,
  pub username: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginPayload {
  pub email: Option<String>,
  pub password: Option<String>,
  #[serde(rename = "type")]
  pub role: Option<AccountRole>,
}

#[derive(Deserialize, Debug)]
pub struct OtpRequestPayload {
  pub email: String,
  #[serde(rename = "type")]
  pub role: Option<AccountRole>,
}

#[derive(Deserialize, Debug)]
pub struct OtpVerifyPayload {
  pub email: String,
  #[serde(rename = "type")]
  pub role: Option<AccountRole>,
  pub otp: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordPayload {
  pub old_password: String,
  pub new_password: String,
  pub confirm_password: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordPayload {
  pub email: String,
  #[serde(rename = "type")]
  pub role: Option<AccountRole>,
  pub new_password: String,
}

async fn run_signup(ctx: SignupCtxData) -> AppResult<crate::models::Account> {
  let flows = ctx.app_state.flows.clone();
  let ctx_data = ContextData::new(ctx);
  if flows.run(ctx_data.clone()).await? == PipelineResult::Stopped {
    warn!("Signup workflow stopped before completion.");
    return Err(AppError::Internal("Signup process was halted".to_string()));
  }
  ctx_data
    .with(|c| c.account.clone())
    .ok_or_else(|| AppError::Internal("Signup completed without creating an account".to_string()))
}

#[instrument(name = "handler::register", skip(app_state, payload))]
pub async fn register_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<RegisterPayload>,
) -> AppResult<HttpResponse> {
  let payload = payload.into_inner();
  let mut ctx = SignupCtxData::new(
    app_state.get_ref().clone(),
    AccountRole::User,
    normalize_email(&payload.email),
    payload.password,
  );
  ctx.first_name = payload.first_name.map(|s| s.trim().to_string());
  ctx.last_name = payload.last_name.map(|s| s.trim().to_string());
  ctx.mobile = payload.mobile;

  let account = run_signup(ctx).await?;
  info!(account_id = %account.id, "User registered.");
  Ok(HttpResponse::Created().json(json!({
    "message": "User registered successfully",
    "user": account,
  })))
}

/// Creates an admin. Open while no admin exists, otherwise admin-only.
#[instrument(name = "handler::add_admin", skip(req, app_state, payload))]
pub async fn add_admin_handler(
  req: HttpRequest,
  app_state: web::Data<AppState>,
  payload: web::Json<AddAdminPayload>,
) -> AppResult<HttpResponse> {
  if app_state.store.admin_exists().await? {
    authenticate(&req, &app_state, Some(AccountRole::Admin)).await?;
  } else {
    info!("No admin exists yet; creating the first one.");
  }

  let payload = payload.into_inner();
  let mut ctx = SignupCtxData::new(
    app_state.get_ref().clone(),
    AccountRole::Admin,
    normalize_email(&payload.email),
    payload.password,
  );
  ctx.username = Some(payload.username.trim().to_string());

  let account = run_signup(ctx).await?;
  Ok(HttpResponse::Created().json(json!({
    "message": "Admin created successfully",
    "admin": account,
  })))
}

#[instrument(name = "handler::login", skip(app_state, payload))]
pub async fn login_handler(app_state: web::Data<AppState>, payload: web::Json<LoginPayload>) -> AppResult<HttpResponse> {
  let payload = payload.into_inner();
  let role = required_role(payload.role)?;
  let ctx_data = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    role,
    email: payload.email.as_deref().map(normalize_email).unwrap_or_default(),
    password: payload.password.unwrap_or_default(),
    account: None,
    access_token: None,
    refresh_token: None,
  });

  if app_state.flows.run(ctx_data.clone()).await? == PipelineResult::Stopped {
    return Err(AppError::Internal("Sign-in process was halted".to_string()));
  }

  let (account, access, refresh) = ctx_data.with(|c| (c.account.clone(), c.access_token.clone(), c.refresh_token.clone()));
  let (Some(account), Some(access), Some(refresh)) = (account, access, refresh) else {
    return Err(AppError::Internal("Sign-in completed without issuing tokens".to_string()));
  };

  let secure = app_state.config.cookie_secure;
  Ok(
    HttpResponse::Ok()
      .cookie(token_cookie(ACCESS_COOKIE, access.token, app_state.tokens.ttl(TokenKind::Access), secure))
      .cookie(token_cookie(REFRESH_COOKIE, refresh.token, app_state.tokens.ttl(TokenKind::Refresh), secure))
      .json(json!({
        "message": "Login successful",
        "user": account,
      })),
  )
}

#[instrument(name = "handler::refresh_token", skip(req, app_state))]
pub async fn refresh_token_handler(req: HttpRequest, app_state: web::Data<AppState>) -> AppResult<HttpResponse> {
  let refresh = req
    .cookie(REFRESH_COOKIE)
    .map(|c| c.value().to_string())
    .ok_or_else(|| AppError::Forbidden("Refresh token is required".to_string()))?;
  let claims = verified_refresh_claims(&app_state, &refresh).await?;

  let access = app_state
    .tokens
    .issue(TokenKind::Access, claims.sub, &claims.email, claims.role)?;
  Ok(
    HttpResponse::Ok()
      .cookie(token_cookie(
        ACCESS_COOKIE,
        access.token,
        app_state.tokens.ttl(TokenKind::Access),
        app_state.config.cookie_secure,
      ))
      .json(json!({ "message": "Token refreshed successfully" })),
  )
}

/// Blacklists the presented tokens until they would have expired anyway.
#[instrument(name = "handler::logout", skip(req, app_state))]
pub async fn logout_handler(req: HttpRequest, app_state: web::Data<AppState>) -> AppResult<HttpResponse> {
  let refresh = req
    .cookie(REFRESH_COOKIE)
    .map(|c| c.value().to_string())
    .ok_or_else(|| AppError::Validation("Refresh token is required".to_string()))?;

  let refresh_claims = app_state
    .tokens
    .decode(TokenKind::Refresh, &refresh)
    .map_err(|_| AppError::Auth("Invalid refresh token".to_string()))?;
  app_state
    .store
    .revoke_token(refresh_claims.jti, refresh_claims.expires_at())
    .await?;

  if let Some(access) = req.cookie(ACCESS_COOKIE) {
    match app_state.tokens.decode(TokenKind::Access, access.value()) {
      Ok(claims) => app_state.store.revoke_token(claims.jti, claims.expires_at()).await?,
      Err(TokenError::Expired) => {}
      Err(e) => warn!(error = %e, "Ignoring unreadable access token at logout."),
    }
  }

  info!(account_id = %refresh_claims.sub, "Logged out.");
  Ok(
    HttpResponse::Ok()
      .cookie(removal_cookie(ACCESS_COOKIE))
      .cookie(removal_cookie(REFRESH_COOKIE))
      .json(json!({ "message": "Logged out successfully" })),
  )
}

#[instrument(name = "handler::request_otp", skip(app_state, payload))]
pub async fn request_otp_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<OtpRequestPayload>,
) -> AppResult<HttpResponse> {
  let role = required_role(payload.role)?;
  let account = app_state
    .store
    .find_account_by_email(role, &normalize_email(&payload.email))
    .await?
    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

  let otp = auth_service::generate_otp();
  let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
  app_state.store.set_reset_otp(account.id, &otp, expires_at).await?;

  // The code is useless if it never arrives, so delivery failures surface.
  app_state.notifier.send(OutgoingEmail::otp(&account, &otp)).await?;
  info!(account_id = %account.id, "Password reset OTP issued.");
  Ok(HttpResponse::Ok().json(json!({ "message": "OTP sent to your email" })))
}

#[instrument(name = "handler::verify_otp", skip(app_state, payload))]
pub async fn verify_otp_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<OtpVerifyPayload>,
) -> AppResult<HttpResponse> {
  let role = required_role(payload.role)?;
  let account = app_state
    .store
    .find_account_by_email(role, &normalize_email(&payload.email))
    .await?
    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

  let now = Utc::now();
  match (account.reset_otp.as_deref(), account.reset_otp_expires_at) {
    (Some(otp), Some(expires_at)) if otp == payload.otp.trim() => {
      if expires_at < now {
        return Err(AppError::Auth("OTP has expired".to_string()));
      }
    }
    _ => {
      warn!(account_id = %account.id, "Wrong OTP submitted.");
      return Err(AppError::Auth("Invalid OTP".to_string()));
    }
  }

  app_state
    .store
    .mark_reset_verified(account.id, now + Duration::minutes(RESET_WINDOW_MINUTES))
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "OTP verified successfully" })))
}

#[instrument(name = "handler::change_password", skip(app_state, session, payload), fields(account_id = %session.0.account_id))]
pub async fn change_password_handler(
  app_state: web::Data<AppState>,
  session: AnySession,
  payload: web::Json<ChangePasswordPayload>,
) -> AppResult<HttpResponse> {
  let payload = payload.into_inner();
  if payload.new_password != payload.confirm_password {
    return Err(AppError::Validation("Passwords do not match".to_string()));
  }
  auth_service::validate_password(&payload.new_password)?;
  if payload.new_password == payload.old_password {
    return Err(AppError::Validation(
      "New password must be different from the old password".to_string(),
    ));
  }

  let account = app_state
    .store
    .find_account(session.0.account_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
  if !auth_service::verify_password(&account.password_hash, &payload.old_password)? {
    return Err(AppError::Validation("Old password is incorrect".to_string()));
  }

  let new_hash = auth_service::hash_password(&payload.new_password)?;
  app_state.store.update_password(account.id, &new_hash).await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Password changed successfully" })))
}

#[instrument(name = "handler::change_forgot_password", skip(app_state, payload))]
pub async fn change_forgot_password_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<ForgotPasswordPayload>,
) -> AppResult<HttpResponse> {
  let role = required_role(payload.role)?;
  auth_service::validate_password(&payload.new_password)?;
  let account = app_state
    .store
    .find_account_by_email(role, &normalize_email(&payload.email))
    .await?
    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

  if !account.reset_verified_until.is_some_and(|until| until > Utc::now()) {
    return Err(AppError::Forbidden("OTP verification required".to_string()));
  }
  if auth_service::verify_password(&account.password_hash, &payload.new_password)? {
    return Err(AppError::Validation(
      "New password must be different from the old password".to_string(),
    ));
  }

  let new_hash = auth_service::hash_password(&payload.new_password)?;
  app_state.store.update_password(account.id, &new_hash).await?;
  info!(account_id = %account.id, "Password reset completed.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Password reset successfully" })))
}
