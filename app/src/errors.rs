// src/errors.rs

use crate::store::StoreError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use stepflow::FlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Payment Processing Error: {0}")]
  Payment(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Store Error: {0}")]
  Store(#[source] StoreError),

  #[error("Workflow Error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Upstream Service Error: {0}")]
  Upstream(String),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<StoreError> for AppError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
      StoreError::Conflict(msg) | StoreError::OutOfRange(msg) => AppError::Validation(msg),
      StoreError::InsufficientStock { product_name, .. } => {
        AppError::Validation(format!("Insufficient stock for product {}", product_name))
      }
      StoreError::InvalidTransition { from, to } => {
        AppError::Validation(format!("Cannot move order from {} to {}", from, to))
      }
      other => AppError::Store(other),
    }
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    AppError::Internal(format!("{:#}", err))
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Validation(_) => StatusCode::BAD_REQUEST,
      AppError::Auth(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Payment(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::Config(_)
      | AppError::Store(_)
      | AppError::Workflow { .. }
      | AppError::Upstream(_)
      | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    let message = match self {
      AppError::Validation(m)
      | AppError::Auth(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Payment(m) => {
        tracing::warn!(application_error = %self, "Responding with client error");
        m.clone()
      }
      _ => {
        // Server-side details stay in the log.
        tracing::error!(application_error = %self, "Responding with server error");
        "Something went wrong".to_string()
      }
    };
    HttpResponse::build(status).json(json!({ "error": message }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
    let resp = err.error_response();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body()).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[actix_rt::test]
  async fn client_errors_echo_their_message() {
    let (status, body) = body_of(AppError::Forbidden("Not a purchaser".into())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "error": "Not a purchaser" }));
  }

  #[actix_rt::test]
  async fn server_errors_hide_details() {
    let (status, body) = body_of(AppError::Internal("connection reset by peer".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Something went wrong" }));
  }

  #[test]
  fn insufficient_stock_maps_to_bad_request() {
    let err = AppError::from(StoreError::InsufficientStock {
      product_id: uuid::Uuid::nil(),
      product_name: "Lamp".into(),
    });
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
  }

  #[test]
  fn out_of_range_maps_to_bad_request() {
    let err = AppError::from(StoreError::OutOfRange("Cart quantity is too large".into()));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert!(err.to_string().ends_with("Cart quantity is too large"));
  }
}
