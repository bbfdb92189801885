// src/pipelines/mod.rs

//! Workflows of the marketplace, registered once at startup.

use crate::errors::AppError;
use stepflow::Stepflow;

pub mod common_steps;
pub mod contexts;

pub mod cancel_order_pipeline;
pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

pub fn register_all_pipelines(flows: &Stepflow<AppError>) {
  tracing::info!("Registering workflows...");

  signup_pipeline::register_signup_pipeline(flows);
  signin_pipeline::register_signin_pipeline(flows);
  cart_pipeline::register_add_to_cart_pipeline(flows);
  checkout_pipeline::register_checkout_pipeline(flows);
  cancel_order_pipeline::register_cancel_order_pipeline(flows);

  tracing::info!("All workflows registered.");
}
