// src/pipelines/signup_pipeline.rs

//! Account creation, shared by user registration and admin creation.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{AccountRole, NewAccount};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::SignupCtxData;
use crate::services::auth_service;
use crate::services::notifier::OutgoingEmail;
use std::sync::Arc;
use stepflow::{ContextData, Pipeline, PipelineControl, SkipCondition, Stepflow};
use tracing::{event, info, instrument, warn, Level};

fn is_blank(value: &Option<String>) -> bool {
  value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[instrument(name = "signup::validate_input", skip(ctx_data))]
async fn validate_signup_input(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (role, email, password, first_name, last_name, username) = {
    let guard = ctx_data.read();
    (
      guard.role,
      guard.email.clone(),
      guard.password.clone(),
      guard.first_name.clone(),
      guard.last_name.clone(),
      guard.username.clone(),
    )
  };

  event!(Level::DEBUG, %email, %role, "Validating signup input.");
  if email.is_empty() || !email.contains('@') {
    warn!("Invalid email format provided for signup.");
    return Err(AppError::Validation("Valid email is required".to_string()));
  }
  auth_service::validate_password(&password)?;

  match role {
    AccountRole::User if is_blank(&first_name) || is_blank(&last_name) => Err(AppError::Validation(
      "First name and last name are required".to_string(),
    )),
    AccountRole::Admin if is_blank(&username) => Err(AppError::Validation("Username is required".to_string())),
    _ => Ok(PipelineControl::Continue),
  }
}

async fn check_existing_account(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (store, role, email) = ctx_data.with(|c| (c.app_state.store.clone(), c.role, c.email.clone()));

  if store.find_account_by_email(role, &email).await?.is_some() {
    warn!(%email, %role, "Signup attempted with an email that is already registered.");
    return Err(AppError::Validation("An account with this email already exists".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "signup::create_account", skip(ctx_data))]
async fn create_account(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (store, password, new_account) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      guard.password.clone(),
      NewAccount {
        role: guard.role,
        email: guard.email.clone(),
        password_hash: String::new(),
        first_name: guard.first_name.clone(),
        last_name: guard.last_name.clone(),
        mobile: guard.mobile.clone(),
        username: guard.username.clone(),
      },
    )
  };

  let password_hash = auth_service::hash_password(&password)?;
  let account = store
    .create_account(NewAccount {
      password_hash,
      ..new_account
    })
    .await?;

  info!(account_id = %account.id, role = %account.role, "Account created.");
  ctx_data.write().account = Some(account);
  Ok(PipelineControl::Continue)
}

async fn send_welcome_email(ctx_data: ContextData<SignupCtxData>) -> AppResult<PipelineControl> {
  let (notifier, account) = ctx_data.with(|c| (c.app_state.notifier.clone(), c.account.clone()));
  let Some(account) = account else {
    warn!("No account in signup context; skipping welcome email.");
    return Ok(PipelineControl::Continue);
  };

  let sent = common_steps::deliver_email(&notifier, OutgoingEmail::welcome(&account)).await;
  ctx_data.write().welcome_email_sent = sent;
  Ok(PipelineControl::Continue)
}

pub fn register_signup_pipeline(flows: &Stepflow<AppError>) {
  // Admins are created by other admins and get no welcome mail.
  let admins_only: SkipCondition<SignupCtxData> = Arc::new(|c: &SignupCtxData| c.role == AccountRole::Admin);

  let mut p = Pipeline::<SignupCtxData, AppError>::new(
    "signup",
    &[
      ("validate_signup_input", false, None),
      ("check_existing_account", false, None),
      ("create_account", false, None),
      ("send_welcome_email", true, Some(admins_only)),
    ],
  );

  p.on("validate_signup_input", validate_signup_input);
  p.on("check_existing_account", check_existing_account);
  p.on("create_account", create_account);
  p.on("send_welcome_email", send_welcome_email);

  flows.register_pipeline(p);
  tracing::info!("Sign-up workflow registered.");
}
