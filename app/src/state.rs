// src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::notifier::Notifier;
use crate::services::payment::PaymentGateway;
use crate::services::token_service::TokenService;
use crate::store::Store;
use stepflow::Stepflow;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn Store>,
  pub flows: Arc<Stepflow<AppError>>,
  pub config: Arc<AppConfig>,
  pub tokens: Arc<TokenService>,
  pub notifier: Arc<dyn Notifier>,
  pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
  /// Builds the shared state and registers every workflow.
  pub fn new(
    store: Arc<dyn Store>,
    config: Arc<AppConfig>,
    notifier: Arc<dyn Notifier>,
    payments: Arc<dyn PaymentGateway>,
  ) -> Self {
    let flows = Arc::new(Stepflow::<AppError>::new());
    pipelines::register_all_pipelines(&flows);
    Self {
      store,
      flows,
      tokens: Arc::new(TokenService::new(&config)),
      config,
      notifier,
      payments,
    }
  }
}
