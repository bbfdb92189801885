// src/pipelines/signin_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::SigninCtxData;
use crate::services::auth_service;
use crate::services::token_service::TokenKind;
use stepflow::{ContextData, Pipeline, PipelineControl, Stepflow};
use tracing::{info, instrument, warn};

async fn validate_signin_input(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (email_empty, password_empty) = ctx_data.with(|c| (c.email.is_empty(), c.password.is_empty()));
  if email_empty || password_empty {
    return Err(AppError::Validation("Email and password are required".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signin::load_account", skip(ctx_data))]
async fn load_account(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (store, role, email) = ctx_data.with(|c| (c.app_state.store.clone(), c.role, c.email.clone()));

  let account = store.find_account_by_email(role, &email).await?.ok_or_else(|| {
    warn!(%role, "Sign-in for unknown account.");
    AppError::NotFound("Account not found".to_string())
  })?;
  ctx_data.write().account = Some(account);
  Ok(PipelineControl::Continue)
}

async fn verify_credentials(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (hash, password) = {
    let guard = ctx_data.read();
    let hash = guard.account.as_ref().map(|a| a.password_hash.clone());
    (hash, guard.password.clone())
  };
  let hash = hash.ok_or_else(|| AppError::Internal("Account not loaded before verification".to_string()))?;

  if !auth_service::verify_password(&hash, &password)? {
    warn!("Sign-in rejected: password mismatch.");
    return Err(AppError::Auth("Invalid credentials".to_string()));
  }
  Ok(PipelineControl::Continue)
}

async fn issue_tokens(ctx_data: ContextData<SigninCtxData>) -> AppResult<PipelineControl> {
  let (tokens, account) = ctx_data.with(|c| (c.app_state.tokens.clone(), c.account.clone()));
  let account = account.ok_or_else(|| AppError::Internal("Account not loaded before token issue".to_string()))?;

  let access = tokens.issue(TokenKind::Access, account.id, &account.email, account.role)?;
  let refresh = tokens.issue(TokenKind::Refresh, account.id, &account.email, account.role)?;
  info!(account_id = %account.id, role = %account.role, "Signed in.");

  ctx_data.update(|c| {
    c.access_token = Some(access);
    c.refresh_token = Some(refresh);
  });
  Ok(PipelineControl::Continue)
}

pub fn register_signin_pipeline(flows: &Stepflow<AppError>) {
  let mut p = Pipeline::<SigninCtxData, AppError>::new(
    "signin",
    &[
      ("validate_signin_input", false, None),
      ("load_account", false, None),
      ("verify_credentials", false, None),
      ("issue_tokens", false, None),
    ],
  );

  p.on("validate_signin_input", validate_signin_input);
  p.on("load_account", load_account);
  p.on("verify_credentials", verify_credentials);
  p.on("issue_tokens", issue_tokens);

  flows.register_pipeline(p);
  tracing::info!("Sign-in workflow registered.");
}
