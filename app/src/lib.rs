// src/lib.rs

//! Marketplace Hub: accounts, catalog, cart, checkout and reviews over a
//! JSON API. Checkout and cancellation run as `stepflow` workflows.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

use crate::config::AppConfig;
use crate::services::notifier::{BrevoNotifier, Notifier, RecordingNotifier};
use crate::services::payment::{MockGateway, PaymentGateway, StripeGateway};
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};
use anyhow::Context;
use std::sync::Arc;

pub use crate::errors::{AppError, Result};

/// Wires the store and the outbound collaborators selected by `config`.
pub async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
  let store: Arc<dyn Store> = match &config.database_url {
    Some(url) => {
      let pg = PgStore::connect(url).await.context("connecting to PostgreSQL")?;
      tracing::info!("Connected to the database.");
      if config.run_migrations {
        pg.migrate().await.context("running migrations")?;
        tracing::info!("Database migrations applied.");
      }
      Arc::new(pg)
    }
    None => {
      tracing::warn!("USE_MEMORY_STORE is set; data will not survive a restart.");
      Arc::new(MemoryStore::new())
    }
  };

  if config.seed_db {
    let seeded = store::seed_catalog(store.as_ref()).await.context("seeding catalog")?;
    tracing::info!(seeded, "Catalog seeding finished.");
  }

  let notifier: Arc<dyn Notifier> = match &config.brevo_api_key {
    Some(key) => Arc::new(BrevoNotifier::new(&config, key.clone())?),
    None => {
      tracing::warn!("BREVO_API_KEY not set; emails are logged instead of sent.");
      Arc::new(RecordingNotifier::new())
    }
  };

  let payments: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
    Some(key) => Arc::new(StripeGateway::new(key.clone())?),
    None => {
      tracing::warn!("STRIPE_SECRET_KEY not set; card payments are simulated.");
      Arc::new(MockGateway::new())
    }
  };

  Ok(AppState::new(store, Arc::new(config), notifier, payments))
}
