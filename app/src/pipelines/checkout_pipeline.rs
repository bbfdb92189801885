// src/pipelines/checkout_pipeline.rs

//! Checkout: turns a user's cart into an order.
//!
//! Stock for every line is reserved in one atomic store call. Steps after the
//! reservation that fail unwind through rollback hooks: a captured card
//! payment is refunded and the reserved stock is released. The cart is only
//! cleared together with the order insert, so a failed checkout leaves it as
//! it was.

use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewOrder, PaymentMethod};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::notifier::OutgoingEmail;
use crate::store::StockLine;
use chrono::Utc;
use std::sync::Arc;
use stepflow::{ContextData, Pipeline, PipelineControl, SkipCondition, Stepflow};
use tracing::{error, info, instrument, warn};

#[instrument(name = "checkout::load_cart", skip(ctx_data))]
async fn load_cart(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (store, user_id) = ctx_data.with(|c| (c.app_state.store.clone(), c.user_id));

  let lines: Vec<StockLine> = store
    .cart_lines(user_id)
    .await?
    .into_iter()
    .map(|line| StockLine {
      product_id: line.product_id,
      quantity: line.quantity,
    })
    .collect();
  if lines.is_empty() {
    warn!(%user_id, "Checkout attempted with an empty cart.");
    return Err(AppError::NotFound("Cart is empty".to_string()));
  }

  info!(%user_id, line_count = lines.len(), "Cart loaded for checkout.");
  ctx_data.write().lines = lines;
  Ok(PipelineControl::Continue)
}

async fn load_customer(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (store, user_id) = ctx_data.with(|c| (c.app_state.store.clone(), c.user_id));
  let customer = common_steps::load_account(&store, user_id).await?;
  ctx_data.write().customer = Some(customer);
  Ok(PipelineControl::Continue)
}

#[instrument(name = "checkout::reserve_stock", skip(ctx_data))]
async fn reserve_stock(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (store, user_id, lines) = ctx_data.with(|c| (c.app_state.store.clone(), c.user_id, c.lines.clone()));

  let reserved = store.reserve_stock(user_id, &lines).await?;
  info!(%user_id, line_count = reserved.len(), "Stock reserved.");
  ctx_data.write().reserved = reserved;
  Ok(PipelineControl::Continue)
}

async fn release_stock(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<()> {
  let (store, user_id, reserved) = ctx_data.with(|c| (c.app_state.store.clone(), c.user_id, c.reserved.clone()));
  if reserved.is_empty() {
    return Ok(());
  }
  store.release_stock(user_id, &reserved).await?;
  warn!(%user_id, line_count = reserved.len(), "Reserved stock released after failed checkout.");
  ctx_data.write().reserved.clear();
  Ok(())
}

#[instrument(name = "checkout::capture_payment", skip(ctx_data))]
async fn capture_payment(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (payments, currency, order_id, amount_cents) = ctx_data.with(|c| {
    (
      c.app_state.payments.clone(),
      c.app_state.config.currency.clone(),
      c.order_id,
      c.reserved_total_cents(),
    )
  });
  let amount_cents = amount_cents.ok_or_else(out_of_range_total)?;

  let receipt = payments.capture(order_id, amount_cents, &currency).await?;
  info!(%order_id, reference = %receipt.reference, amount_cents, "Card payment captured.");
  ctx_data.write().payment = Some(receipt);
  Ok(PipelineControl::Continue)
}

async fn refund_payment(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<()> {
  let (payments, receipt) = ctx_data.with(|c| (c.app_state.payments.clone(), c.payment.clone()));
  let Some(receipt) = receipt else {
    return Ok(());
  };
  payments.refund(&receipt.reference).await?;
  warn!(reference = %receipt.reference, "Card payment refunded after failed checkout.");
  ctx_data.write().payment = None;
  Ok(())
}

#[instrument(name = "checkout::persist_order", skip(ctx_data))]
async fn persist_order(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (store, new_order) = {
    let guard = ctx_data.read();
    (
      guard.app_state.store.clone(),
      NewOrder {
        id: guard.order_id,
        user_id: guard.user_id,
        items: guard.reserved.clone(),
        payment_method: guard.payment_method,
        payment_reference: guard.payment.as_ref().map(|p| p.reference.clone()),
        order_date: Utc::now(),
      },
    )
  };

  if new_order.total_cents().is_none() {
    return Err(out_of_range_total());
  }

  let order = store.create_order(new_order).await.map_err(|e| {
    error!(error = %e, "Order insert failed; unwinding checkout.");
    AppError::from(e)
  })?;
  info!(order_id = %order.id, total_cents = order.total_cents, "Order placed.");
  ctx_data.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

fn out_of_range_total() -> AppError {
  AppError::Validation("Order total is out of range".to_string())
}

async fn send_order_confirmation(ctx_data: ContextData<CheckoutCtxData>) -> AppResult<PipelineControl> {
  let (notifier, customer, order) =
    ctx_data.with(|c| (c.app_state.notifier.clone(), c.customer.clone(), c.order.clone()));
  let (Some(customer), Some(order)) = (customer, order) else {
    warn!("Order or customer missing; no confirmation sent.");
    return Ok(PipelineControl::Continue);
  };

  let sent = common_steps::deliver_email(&notifier, OutgoingEmail::invoice(&customer, &order)).await;
  ctx_data.write().confirmation_sent = sent;
  Ok(PipelineControl::Continue)
}

fn unless_card() -> SkipCondition<CheckoutCtxData> {
  Arc::new(|c: &CheckoutCtxData| c.payment_method != PaymentMethod::Card)
}

pub fn register_checkout_pipeline(flows: &Stepflow<AppError>) {
  let mut p = Pipeline::<CheckoutCtxData, AppError>::new(
    "checkout",
    &[
      ("load_cart", false, None),
      ("load_customer", false, None),
      ("reserve_stock", false, None),
      ("capture_payment", false, Some(unless_card())),
      ("persist_order", false, None),
      ("send_order_confirmation", true, None),
    ],
  );

  p.on("load_cart", load_cart);
  p.on("load_customer", load_customer);
  p.on("reserve_stock", reserve_stock);
  p.on_rollback("reserve_stock", release_stock);
  p.on("capture_payment", capture_payment);
  p.on_rollback("capture_payment", refund_payment);
  p.on("persist_order", persist_order);
  p.on("send_order_confirmation", send_order_confirmation);

  flows.register_pipeline(p);
  tracing::info!("Checkout workflow registered.");
}
