// src/services/payment.rs

//! Card payment capture and refund. `StripeGateway` talks to the Payment
//! Intents API; `MockGateway` settles everything in memory.

use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const STRIPE_API: &str = "https://api.stripe.com/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
  /// Gateway reference of the captured payment, used for refunds.
  pub reference: String,
  pub amount_cents: i64,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn capture(&self, order_id: Uuid, amount_cents: i64, currency: &str) -> AppResult<PaymentReceipt>;
  async fn refund(&self, reference: &str) -> AppResult<()>;
}

#[derive(Debug, Deserialize)]
struct StripeIntent {
  id: String,
  status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
  error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
  message: Option<String>,
  code: Option<String>,
}

pub struct StripeGateway {
  http: reqwest::Client,
  secret_key: String,
}

impl StripeGateway {
  pub fn new(secret_key: String) -> AppResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(15))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build payment HTTP client: {}", e)))?;
    Ok(Self { http, secret_key })
  }

  async fn post_form(&self, path: &str, form: &[(&str, String)]) -> AppResult<reqwest::Response> {
    let response = self
      .http
      .post(format!("{}{}", STRIPE_API, path))
      .bearer_auth(&self.secret_key)
      .form(form)
      .send()
      .await
      .map_err(|e| AppError::Upstream(format!("Payment request failed: {}", e)))?;

    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response
      .json::<StripeErrorBody>()
      .await
      .map_err(|e| AppError::Upstream(format!("Payment API returned {} with unreadable body: {}", status, e)))?;
    let message = body.error.message.unwrap_or_else(|| "Payment was declined".to_string());
    if status.is_client_error() {
      warn!(code = ?body.error.code, %status, "Payment rejected by gateway.");
      Err(AppError::Payment(message))
    } else {
      Err(AppError::Upstream(format!("Payment API returned {}: {}", status, message)))
    }
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  #[instrument(name = "payment::stripe_capture", skip(self), err(Display))]
  async fn capture(&self, order_id: Uuid, amount_cents: i64, currency: &str) -> AppResult<PaymentReceipt> {
    let form = [
      ("amount", amount_cents.to_string()),
      ("currency", currency.to_string()),
      ("payment_method", "pm_card_visa".to_string()),
      ("confirm", "true".to_string()),
      ("automatic_payment_methods[enabled]", "true".to_string()),
      ("automatic_payment_methods[allow_redirects]", "never".to_string()),
      ("metadata[order_id]", order_id.to_string()),
    ];
    let intent = self
      .post_form("/payment_intents", &form)
      .await?
      .json::<StripeIntent>()
      .await
      .map_err(|e| AppError::Upstream(format!("Unreadable payment intent: {}", e)))?;

    if intent.status != "succeeded" {
      warn!(intent_id = %intent.id, status = %intent.status, "Payment intent not settled.");
      return Err(AppError::Payment(format!("Payment not completed (status: {})", intent.status)));
    }
    info!(intent_id = %intent.id, "Payment captured.");
    Ok(PaymentReceipt {
      reference: intent.id,
      amount_cents,
    })
  }

  #[instrument(name = "payment::stripe_refund", skip(self), err(Display))]
  async fn refund(&self, reference: &str) -> AppResult<()> {
    self
      .post_form("/refunds", &[("payment_intent", reference.to_string())])
      .await?;
    info!("Payment refunded.");
    Ok(())
  }
}

/// In-memory gateway that records captures and refunds.
#[derive(Default)]
pub struct MockGateway {
  captures: Mutex<Vec<PaymentReceipt>>,
  refunds: Mutex<Vec<String>>,
  decline: bool,
}

impl MockGateway {
  pub fn new() -> Self {
    Self::default()
  }

  /// A gateway that declines every capture.
  pub fn declining() -> Self {
    Self {
      decline: true,
      ..Self::default()
    }
  }

  pub fn captures(&self) -> Vec<PaymentReceipt> {
    self.captures.lock().clone()
  }

  pub fn refunds(&self) -> Vec<String> {
    self.refunds.lock().clone()
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  #[instrument(name = "payment::mock_capture", skip(self))]
  async fn capture(&self, order_id: Uuid, amount_cents: i64, currency: &str) -> AppResult<PaymentReceipt> {
    if amount_cents <= 0 {
      return Err(AppError::Payment("Amount must be greater than zero".to_string()));
    }
    if self.decline {
      info!("Mock payment declined.");
      return Err(AppError::Payment("Your card was declined.".to_string()));
    }
    let receipt = PaymentReceipt {
      reference: format!("mock_pi_{}", Uuid::new_v4().simple()),
      amount_cents,
    };
    info!(reference = %receipt.reference, "Mock payment captured.");
    self.captures.lock().push(receipt.clone());
    Ok(receipt)
  }

  #[instrument(name = "payment::mock_refund", skip(self))]
  async fn refund(&self, reference: &str) -> AppResult<()> {
    self.refunds.lock().push(reference.to_string());
    Ok(())
  }
}
