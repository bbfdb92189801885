// src/pipelines/cancel_order_pipeline.rs

//! Cancellation of a placed order by its buyer.

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CancelOrderCtxData;
use crate::services::notifier::OutgoingEmail;
use std::sync::Arc;
use stepflow::{ContextData, Pipeline, PipelineControl, SkipCondition, Stepflow};
use tracing::{error, info, instrument, warn};

#[instrument(name = "cancel_order::load_order", skip(ctx_data))]
async fn load_order(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (store, order_id, requested_by) = ctx_data.with(|c| (c.app_state.store.clone(), c.order_id, c.requested_by));

  let order = store
    .get_order(order_id)
    .await?
    .filter(|o| o.user_id == requested_by)
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  let customer = common_steps::load_account(&store, order.user_id).await?;

  ctx_data.update(|c| {
    c.order = Some(order);
    c.customer = Some(customer);
  });
  Ok(PipelineControl::Continue)
}

async fn check_cancellable(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let status = ctx_data.with(|c| c.order.as_ref().map(|o| o.status));
  let status = status.ok_or_else(|| AppError::Internal("Order not loaded before status check".to_string()))?;
  if !status.is_cancellable() {
    return Err(AppError::Validation(format!(
      "Order is already {}",
      status.to_string().to_lowercase()
    )));
  }
  Ok(PipelineControl::Continue)
}

async fn restore_stock_and_cancel(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (store, order_id) = ctx_data.with(|c| (c.app_state.store.clone(), c.order_id));

  let order = store.cancel_order(order_id).await?;
  info!(%order_id, "Order cancelled and stock restored.");
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

/// Runs only once the cancellation is committed, so a payment is never
/// returned for an order that stays live.
#[instrument(name = "cancel_order::refund_payment", skip(ctx_data))]
async fn refund_payment(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (payments, order_id, reference) = ctx_data.with(|c| {
    (
      c.app_state.payments.clone(),
      c.order_id,
      c.order.as_ref().and_then(|o| o.payment_reference.clone()),
    )
  });
  let Some(reference) = reference else {
    return Ok(PipelineControl::Continue);
  };

  if let Err(e) = payments.refund(&reference).await {
    error!(%order_id, %reference, error = %e, "Order cancelled but its refund failed; needs manual refund.");
    return Err(e);
  }
  info!(%reference, "Payment refunded for cancelled order.");
  ctx_data.write().refunded = true;
  Ok(PipelineControl::Continue)
}

async fn send_cancellation_notice(ctx_data: ContextData<CancelOrderCtxData>) -> AppResult<PipelineControl> {
  let (notifier, customer, order) =
    ctx_data.with(|c| (c.app_state.notifier.clone(), c.customer.clone(), c.order.clone()));
  let (Some(customer), Some(order)) = (customer, order) else {
    warn!("Order or customer missing; no cancellation notice sent.");
    return Ok(PipelineControl::Continue);
  };

  let sent = common_steps::deliver_email(&notifier, OutgoingEmail::cancellation(&customer, &order)).await;
  ctx_data.write().notice_sent = sent;
  Ok(PipelineControl::Continue)
}

pub fn register_cancel_order_pipeline(flows: &Stepflow<AppError>) {
  let unpaid: SkipCondition<CancelOrderCtxData> = Arc::new(|c: &CancelOrderCtxData| {
    c.order.as_ref().and_then(|o| o.payment_reference.as_ref()).is_none()
  });

  let mut p = Pipeline::<CancelOrderCtxData, AppError>::new(
    "cancel_order",
    &[
      ("load_order", false, None),
      ("check_cancellable", false, None),
      ("restore_stock_and_cancel", false, None),
      ("refund_payment", false, Some(unpaid)),
      ("send_cancellation_notice", true, None),
    ],
  );

  p.on("load_order", load_order);
  p.on("check_cancellable", check_cancellable);
  p.on("restore_stock_and_cancel", restore_stock_and_cancel);
  p.on("refund_payment", refund_payment);
  p.on("send_cancellation_notice", send_cancellation_notice);

  flows.register_pipeline(p);
  tracing::info!("Cancel-order workflow registered.");
}
