// src/pipelines/cart_pipeline.rs

use crate::errors::{AppError, Result as AppResult};
use crate::pipelines::contexts::AddToCartCtxData;
use stepflow::{ContextData, Pipeline, PipelineControl, Stepflow};
use tracing::{info, instrument, warn};

async fn validate_cart_input(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let quantity = ctx_data.read().quantity;
  if quantity <= 0 {
    warn!(quantity, "Add to cart: non-positive quantity.");
    return Err(AppError::Validation("Quantity must be a positive number".to_string()));
  }
  Ok(PipelineControl::Continue)
}

#[instrument(name = "cart::fetch_product", skip(ctx_data))]
async fn fetch_product_for_cart(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let (store, user_id, product_id) = ctx_data.with(|c| (c.app_state.store.clone(), c.user_id, c.product_id));

  let product = store
    .get_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  let already_in_cart = store
    .cart_lines(user_id)
    .await?
    .into_iter()
    .find(|line| line.product_id == product_id)
    .map_or(0, |line| line.quantity);

  ctx_data.update(|c| {
    c.product = Some(product);
    c.already_in_cart = already_in_cart;
  });
  Ok(PipelineControl::Continue)
}

/// Rejects lines that could never be checked out. Stock is only reserved at
/// checkout, so this is advisory.
async fn check_product_stock_for_cart(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let (requested, stock) = {
    let guard = ctx_data.read();
    let stock = guard.product.as_ref().map(|p| (p.name.clone(), p.quantity));
    (guard.already_in_cart.checked_add(guard.quantity), stock)
  };
  let requested = requested.ok_or_else(|| AppError::Validation("Cart quantity is too large".to_string()))?;
  let (name, available) = stock.ok_or_else(|| AppError::Internal("Product not loaded before stock check".to_string()))?;

  if requested > available {
    warn!(requested, available, "Add to cart exceeds stock.");
    return Err(AppError::Validation(format!(
      "Only {} unit(s) of {} in stock",
      available, name
    )));
  }
  Ok(PipelineControl::Continue)
}

async fn add_or_update_cart_item(ctx_data: ContextData<AddToCartCtxData>) -> AppResult<PipelineControl> {
  let (store, user_id, product_id, quantity) =
    ctx_data.with(|c| (c.app_state.store.clone(), c.user_id, c.product_id, c.quantity));

  let item = store.add_to_cart(user_id, product_id, quantity).await?;
  info!(%user_id, %product_id, quantity = item.quantity, "Cart line updated.");
  ctx_data.write().cart_item = Some(item);
  Ok(PipelineControl::Continue)
}

pub fn register_add_to_cart_pipeline(flows: &Stepflow<AppError>) {
  let mut p = Pipeline::<AddToCartCtxData, AppError>::new(
    "add_to_cart",
    &[
      ("validate_cart_input", false, None),
      ("fetch_product_for_cart", false, None),
      ("check_product_stock_for_cart", false, None),
      ("add_or_update_cart_item", false, None),
    ],
  );

  p.on("validate_cart_input", validate_cart_input);
  p.on("fetch_product_for_cart", fetch_product_for_cart);
  p.on("check_product_stock_for_cart", check_product_stock_for_cart);
  p.on("add_or_update_cart_item", add_or_update_cart_item);

  flows.register_pipeline(p);
  tracing::info!("Add-to-cart workflow registered.");
}
