// src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;

/// Brevo template IDs, one per transactional email.
#[derive(Debug, Clone)]
pub struct EmailTemplates {
  pub welcome: i64,
  pub otp: i64,
  pub invoice: i64,
  pub cancellation: i64,
}

impl Default for EmailTemplates {
  fn default() -> Self {
    Self {
      welcome: 10,
      otp: 1,
      invoice: 2,
      cancellation: 3,
    }
  }
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// `None` runs against the in-memory store.
  pub database_url: Option<String>,
  pub run_migrations: bool,
  pub seed_db: bool,

  pub jwt_secret: String,
  pub jwt_refresh_secret: String,
  pub access_token_ttl_secs: i64,
  pub refresh_token_ttl_secs: i64,
  pub cookie_secure: bool,
  pub cors_origin: String,

  pub brevo_api_key: Option<String>,
  pub email_sender_name: String,
  pub email_sender_address: String,
  pub email_templates: EmailTemplates,

  pub stripe_secret_key: Option<String>,
  pub currency: String,
}

impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("database", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("access_token_ttl_secs", &self.access_token_ttl_secs)
      .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
      .field("cookie_secure", &self.cookie_secure)
      .field("cors_origin", &self.cors_origin)
      .field("brevo_enabled", &self.brevo_api_key.is_some())
      .field("stripe_enabled", &self.stripe_secret_key.is_some())
      .finish()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let optional = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());
    let parse_bool = |var_name: &str, default: bool| -> Result<bool> {
      match optional(var_name) {
        Some(v) => v
          .parse::<bool>()
          .map_err(|e| AppError::Config(format!("Invalid {} value: {}", var_name, e))),
        None => Ok(default),
      }
    };
    let parse_i64 = |var_name: &str, default: i64| -> Result<i64> {
      match optional(var_name) {
        Some(v) => v
          .parse::<i64>()
          .map_err(|e| AppError::Config(format!("Invalid {} value: {}", var_name, e))),
        None => Ok(default),
      }
    };

    let server_host = optional("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = optional("SERVER_PORT")
      .unwrap_or_else(|| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let use_memory_store = parse_bool("USE_MEMORY_STORE", false)?;
    let database_url = if use_memory_store {
      None
    } else {
      Some(get_env("DATABASE_URL")?)
    };

    let jwt_secret = get_env("JWT_SECRET")?;
    let jwt_refresh_secret = get_env("JWT_REFRESH_SECRET")?;
    if jwt_secret == jwt_refresh_secret {
      return Err(AppError::Config(
        "JWT_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
      ));
    }

    let defaults = EmailTemplates::default();
    let email_templates = EmailTemplates {
      welcome: parse_i64("BREVO_TEMPLATE_WELCOME", defaults.welcome)?,
      otp: parse_i64("BREVO_TEMPLATE_OTP", defaults.otp)?,
      invoice: parse_i64("BREVO_TEMPLATE_INVOICE", defaults.invoice)?,
      cancellation: parse_i64("BREVO_TEMPLATE_CANCELLATION", defaults.cancellation)?,
    };

    let config = Self {
      server_host,
      server_port,
      database_url,
      run_migrations: parse_bool("RUN_MIGRATIONS", true)?,
      seed_db: parse_bool("SEED_DB", false)?,
      jwt_secret,
      jwt_refresh_secret,
      access_token_ttl_secs: parse_i64("ACCESS_TOKEN_TTL_SECS", 2 * 60 * 60)?,
      refresh_token_ttl_secs: parse_i64("REFRESH_TOKEN_TTL_SECS", 7 * 24 * 60 * 60)?,
      cookie_secure: parse_bool("COOKIE_SECURE", false)?,
      cors_origin: optional("CORS_ORIGIN").unwrap_or_else(|| "http://localhost".to_string()),
      brevo_api_key: optional("BREVO_API_KEY"),
      email_sender_name: optional("EMAIL_SENDER_NAME").unwrap_or_else(|| "Marketplace Hub".to_string()),
      email_sender_address: optional("EMAIL_SENDER_ADDRESS").unwrap_or_else(|| "noreply@example.com".to_string()),
      email_templates,
      stripe_secret_key: optional("STRIPE_SECRET_KEY"),
      currency: optional("PAYMENT_CURRENCY").unwrap_or_else(|| "usd".to_string()),
    };

    tracing::info!(config = ?config, "Application configuration loaded.");
    Ok(config)
  }

  /// In-memory configuration with the given signing secrets and default TTLs.
  pub fn with_secrets(jwt_secret: &str, jwt_refresh_secret: &str) -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 0,
      database_url: None,
      run_migrations: false,
      seed_db: false,
      jwt_secret: jwt_secret.to_string(),
      jwt_refresh_secret: jwt_refresh_secret.to_string(),
      access_token_ttl_secs: 2 * 60 * 60,
      refresh_token_ttl_secs: 7 * 24 * 60 * 60,
      cookie_secure: false,
      cors_origin: "http://localhost".to_string(),
      brevo_api_key: None,
      email_sender_name: "Marketplace Hub".to_string(),
      email_sender_address: "noreply@example.com".to_string(),
      email_templates: EmailTemplates::default(),
      stripe_secret_key: None,
      currency: "usd".to_string(),
    }
  }
}
