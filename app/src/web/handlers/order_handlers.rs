// src/web/handlers/order_handlers.rs

//! Checkout, order history and cancellation for shoppers.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use stepflow::{ContextData, PipelineResult};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::PaymentMethod;
use crate::pipelines::contexts::{CancelOrderCtxData, CheckoutCtxData};
use crate::state::AppState;
use crate::web::session::UserSession;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
  pub payment_method: Option<PaymentMethod>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderPayload {
  pub order_id: Uuid,
}

#[instrument(name = "handler::checkout", skip(app_state, session), fields(user_id = %session.0.account_id))]
pub async fn checkout_cart_handler(
  app_state: web::Data<AppState>,
  session: UserSession,
  payload: web::Json<CheckoutPayload>,
) -> AppResult<HttpResponse> {
  let payment_method = payload
    .payment_method
    .ok_or_else(|| AppError::Validation("Missing required field: paymentMethod".to_string()))?;
  let ctx_data = ContextData::new(CheckoutCtxData::new(
    app_state.get_ref().clone(),
    session.0.account_id,
    payment_method,
  ));

  if app_state.flows.run(ctx_data.clone()).await? == PipelineResult::Stopped {
    warn!("Checkout workflow stopped before placing the order.");
    return Err(AppError::Internal("Checkout was halted".to_string()));
  }

  let (order, confirmation_sent) = ctx_data.with(|c| (c.order.clone(), c.confirmation_sent));
  let order = order.ok_or_else(|| AppError::Internal("Checkout completed without an order".to_string()))?;
  info!(order_id = %order.id, confirmation_sent, "Checkout completed.");

  let message = match payment_method {
    PaymentMethod::Card => "Payment successful",
    PaymentMethod::Cash => "Cash on Delivery",
  };
  Ok(HttpResponse::Ok().json(json!({
    "message": message,
    "order": order,
  })))
}

#[instrument(name = "handler::list_orders", skip_all, fields(user_id = %session.0.account_id))]
pub async fn list_orders_handler(app_state: web::Data<AppState>, session: UserSession) -> AppResult<HttpResponse> {
  let orders = app_state.store.list_orders_for_user(session.0.account_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::cancel_order", skip(app_state, session), fields(user_id = %session.0.account_id))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  session: UserSession,
  payload: web::Json<CancelOrderPayload>,
) -> AppResult<HttpResponse> {
  let ctx_data = ContextData::new(CancelOrderCtxData::new(
    app_state.get_ref().clone(),
    session.0.account_id,
    payload.order_id,
  ));

  if app_state.flows.run(ctx_data.clone()).await? == PipelineResult::Stopped {
    return Err(AppError::Internal("Cancellation was halted".to_string()));
  }
  let order = ctx_data
    .with(|c| c.order.clone())
    .ok_or_else(|| AppError::Internal("Cancellation completed without an order".to_string()))?;

  Ok(HttpResponse::Ok().json(json!({
    "message": "Order cancelled successfully",
    "order": order,
  })))
}
