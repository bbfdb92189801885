// src/pipelines/common_steps.rs

//! Pieces shared by several workflows.

use crate::errors::AppError;
use crate::models::Account;
use crate::services::notifier::{Notifier, OutgoingEmail};
use crate::store::Store;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Sends a notification without letting a delivery failure escape.
/// Returns whether the email was accepted.
#[instrument(name = "common_step::deliver_email", skip(notifier, email), fields(template = ?email.template))]
pub async fn deliver_email(notifier: &Arc<dyn Notifier>, email: OutgoingEmail) -> bool {
  match notifier.send(email).await {
    Ok(()) => {
      info!("Notification delivered.");
      true
    }
    Err(e) => {
      warn!(error = %e, "Notification failed; continuing.");
      false
    }
  }
}

pub async fn load_account(store: &Arc<dyn Store>, account_id: Uuid) -> Result<Account, AppError> {
  store
    .find_account(account_id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
