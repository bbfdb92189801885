// src/web/handlers/mod.rs

use crate::errors::AppError;
use crate::models::AccountRole;

pub mod admin_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod order_handlers;
pub mod product_handlers;
pub mod review_handlers;

/// Emails are matched case-insensitively and stored lowercased.
pub(crate) fn normalize_email(email: &str) -> String {
  email.trim().to_lowercase()
}

pub(crate) fn required_role(role: Option<AccountRole>) -> Result<AccountRole, AppError> {
  role.ok_or_else(|| AppError::Validation("Invalid user type".to_string()))
}
