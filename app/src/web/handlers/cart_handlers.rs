// src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use stepflow::{ContextData, PipelineResult};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::AddToCartCtxData;
use crate::state::AppState;
use crate::web::session::UserSession;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CartLinePayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromCartPayload {
  pub product_id: Uuid,
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, session, payload),
  fields(user_id = %session.0.account_id, product_id = %payload.product_id)
)]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  session: UserSession,
  payload: web::Json<CartLinePayload>,
) -> AppResult<HttpResponse> {
  let ctx_data = ContextData::new(AddToCartCtxData::new(
    app_state.get_ref().clone(),
    session.0.account_id,
    payload.product_id,
    payload.quantity,
  ));

  if app_state.flows.run(ctx_data.clone()).await? == PipelineResult::Stopped {
    return Err(AppError::Internal("Add to cart was halted".to_string()));
  }
  let cart_item = ctx_data
    .with(|c| c.cart_item.clone())
    .ok_or_else(|| AppError::Internal("Cart line missing after add to cart".to_string()))?;

  Ok(HttpResponse::Ok().json(json!({
    "message": "Product added to cart successfully",
    "cartItem": cart_item,
  })))
}

#[instrument(name = "handler::remove_from_cart", skip(app_state, session), fields(user_id = %session.0.account_id))]
pub async fn remove_product_handler(
  app_state: web::Data<AppState>,
  session: UserSession,
  payload: web::Json<RemoveFromCartPayload>,
) -> AppResult<HttpResponse> {
  app_state
    .store
    .remove_from_cart(session.0.account_id, payload.product_id)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "message": "Product removed from cart successfully" })))
}

#[instrument(name = "handler::change_quantity", skip(app_state, session), fields(user_id = %session.0.account_id))]
pub async fn change_quantity_handler(
  app_state: web::Data<AppState>,
  session: UserSession,
  payload: web::Json<CartLinePayload>,
) -> AppResult<HttpResponse> {
  if payload.quantity <= 0 {
    return Err(AppError::Validation("Quantity must be a positive number".to_string()));
  }
  let product = app_state
    .store
    .get_product(payload.product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  if payload.quantity > product.quantity {
    return Err(AppError::Validation(format!(
      "Only {} unit(s) of {} in stock",
      product.quantity, product.name
    )));
  }

  let cart_item = app_state
    .store
    .set_cart_quantity(session.0.account_id, payload.product_id, payload.quantity)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Cart updated successfully",
    "cartItem": cart_item,
  })))
}

#[instrument(name = "handler::get_cart", skip_all, fields(user_id = %session.0.account_id))]
pub async fn get_cart_handler(app_state: web::Data<AppState>, session: UserSession) -> AppResult<HttpResponse> {
  let lines = app_state.store.cart_lines(session.0.account_id).await?;
  let total_cents = lines
    .iter()
    .try_fold(0i64, |total, l| {
      l.price_cents.checked_mul(i64::from(l.quantity)).and_then(|line| total.checked_add(line))
    })
    .ok_or_else(|| AppError::Validation("Cart total is out of range".to_string()))?;
  info!(line_count = lines.len(), total_cents, "Cart served.");
  Ok(HttpResponse::Ok().json(json!({
    "cart": lines,
    "totalPrice": total_cents,
  })))
}
