// src/services/notifier.rs

//! Transactional email. Production sends Brevo template emails; local runs
//! and tests use `RecordingNotifier`.

use crate::config::AppConfig;
use crate::errors::{AppError, Result as AppResult};
use crate::models::{Account, Order};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, instrument, warn};

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
  Welcome,
  Otp,
  Invoice,
  Cancellation,
}

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
  pub to: String,
  pub template: EmailTemplate,
  pub params: Value,
}

/// Renders cents as a decimal amount, e.g. `1250` as `12.50`.
pub fn format_cents(cents: i64) -> String {
  let sign = if cents < 0 { "-" } else { "" };
  let cents = cents.unsigned_abs();
  format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

fn day_month_year(at: DateTime<Utc>) -> String {
  at.format("%-d-%-m-%Y").to_string()
}

fn order_lines(order: &Order) -> Value {
  Value::Array(
    order
      .items
      .iter()
      .map(|item| {
        json!({
          "productName": item.product_name,
          "quantity": item.quantity,
          "price": format_cents(item.price_cents),
        })
      })
      .collect(),
  )
}

impl OutgoingEmail {
  pub fn welcome(account: &Account) -> Self {
    Self {
      to: account.email.clone(),
      template: EmailTemplate::Welcome,
      params: json!({
        "firstName": account.display_name(),
        "currentYear": Utc::now().year(),
      }),
    }
  }

  pub fn otp(account: &Account, otp: &str) -> Self {
    Self {
      to: account.email.clone(),
      template: EmailTemplate::Otp,
      params: json!({ "otp": otp }),
    }
  }

  pub fn invoice(account: &Account, order: &Order) -> Self {
    Self {
      to: account.email.clone(),
      template: EmailTemplate::Invoice,
      params: json!({
        "firstName": account.first_name,
        "lastName": account.last_name,
        "orderId": order.id,
        "orderDate": day_month_year(order.order_date),
        "products": order_lines(order),
        "totalPrice": format_cents(order.total_cents),
        "currentYear": order.order_date.year(),
      }),
    }
  }

  pub fn cancellation(account: &Account, order: &Order) -> Self {
    let now = Utc::now();
    Self {
      to: account.email.clone(),
      template: EmailTemplate::Cancellation,
      params: json!({
        "firstName": account.first_name,
        "lastName": account.last_name,
        "orderId": order.id,
        "cancellationDate": day_month_year(now),
        "products": order_lines(order),
        "totalPrice": format_cents(order.total_cents),
        "currentYear": now.year(),
      }),
    }
  }
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send(&self, email: OutgoingEmail) -> AppResult<()>;
}

pub struct BrevoNotifier {
  http: reqwest::Client,
  api_key: String,
  sender_name: String,
  sender_address: String,
  templates: crate::config::EmailTemplates,
}

impl BrevoNotifier {
  pub fn new(config: &AppConfig, api_key: String) -> AppResult<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(10))
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build email HTTP client: {}", e)))?;
    Ok(Self {
      http,
      api_key,
      sender_name: config.email_sender_name.clone(),
      sender_address: config.email_sender_address.clone(),
      templates: config.email_templates.clone(),
    })
  }

  fn template_id(&self, template: EmailTemplate) -> i64 {
    match template {
      EmailTemplate::Welcome => self.templates.welcome,
      EmailTemplate::Otp => self.templates.otp,
      EmailTemplate::Invoice => self.templates.invoice,
      EmailTemplate::Cancellation => self.templates.cancellation,
    }
  }
}

#[async_trait]
impl Notifier for BrevoNotifier {
  #[instrument(name = "notifier::brevo_send", skip(self, email), fields(template = ?email.template), err(Display))]
  async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
    let body = json!({
      "sender": { "name": self.sender_name, "email": self.sender_address },
      "to": [{ "email": email.to }],
      "templateId": self.template_id(email.template),
      "params": email.params,
    });

    let response = self
      .http
      .post(BREVO_SEND_URL)
      .header("api-key", &self.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| AppError::Upstream(format!("Email request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
      let detail = response.text().await.unwrap_or_default();
      return Err(AppError::Upstream(format!("Email API returned {}: {}", status, detail)));
    }
    info!("Transactional email accepted.");
    Ok(())
  }
}

/// Logs and keeps every email instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
  sent: Mutex<Vec<OutgoingEmail>>,
  fail: bool,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  /// A notifier whose every send fails.
  pub fn failing() -> Self {
    Self {
      sent: Mutex::new(Vec::new()),
      fail: true,
    }
  }

  pub fn sent(&self) -> Vec<OutgoingEmail> {
    self.sent.lock().clone()
  }

  pub fn sent_with(&self, template: EmailTemplate) -> Vec<OutgoingEmail> {
    self.sent.lock().iter().filter(|e| e.template == template).cloned().collect()
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
    if self.fail {
      warn!(template = ?email.template, "Recording notifier configured to fail.");
      return Err(AppError::Upstream("email delivery unavailable".to_string()));
    }
    info!(template = ?email.template, params = %email.params, "Email recorded (not sent).");
    self.sent.lock().push(email);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cents_render_with_two_decimals() {
    assert_eq!(format_cents(1250), "12.50");
    assert_eq!(format_cents(5), "0.05");
    assert_eq!(format_cents(-199), "-1.99");
  }

  #[test]
  fn dates_are_day_month_year_without_padding() {
    let at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2025, 3, 7, 12, 0, 0).unwrap();
    assert_eq!(day_month_year(at), "7-3-2025");
  }

  #[actix_rt::test]
  async fn failing_notifier_records_nothing() {
    let notifier = RecordingNotifier::failing();
    let email = OutgoingEmail {
      to: "a@b.c".into(),
      template: EmailTemplate::Otp,
      params: json!({ "otp": "123456" }),
    };
    assert!(notifier.send(email).await.is_err());
    assert!(notifier.sent().is_empty());
  }
}
