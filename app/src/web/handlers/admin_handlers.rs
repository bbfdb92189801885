// src/web/handlers/admin_handlers.rs

//! Catalog management and order administration.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{NewProduct, OrderStatus, ProductPatch, ProductQuery, MAX_PRICE_CENTS};
use crate::state::AppState;
use crate::web::session::AdminSession;

const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Deserialize, Debug)]
pub struct AddProductPayload {
  pub name: Option<String>,
  pub description: Option<String>,
  /// Cents.
  pub price: Option<i64>,
  pub quantity: Option<i32>,
}

#[derive(Deserialize, Debug)]
pub struct EditProductPayload {
  pub id: Uuid,
  #[serde(flatten)]
  pub patch: ProductPatch,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusPayload {
  pub order_id: Uuid,
  pub status: OrderStatus,
}

fn validate_price(price: i64) -> AppResult<()> {
  if price <= 0 {
    return Err(AppError::Validation("Price must be a positive number".to_string()));
  }
  if price > MAX_PRICE_CENTS {
    return Err(AppError::Validation(format!("Price must not exceed {} cents", MAX_PRICE_CENTS)));
  }
  Ok(())
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
  if quantity < 0 {
    return Err(AppError::Validation("Quantity must be a non-negative number".to_string()));
  }
  Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[instrument(name = "handler::admin_add_product", skip(app_state, _session))]
pub async fn add_product_handler(
  app_state: web::Data<AppState>,
  _session: AdminSession,
  payload: web::Json<AddProductPayload>,
) -> AppResult<HttpResponse> {
  let payload = payload.into_inner();
  let (Some(name), Some(description), Some(price), Some(quantity)) = (
    non_blank(payload.name),
    non_blank(payload.description),
    payload.price,
    payload.quantity,
  ) else {
    return Err(AppError::Validation("All required fields must be provided".to_string()));
  };
  validate_price(price)?;
  validate_quantity(quantity)?;

  let product = app_state
    .store
    .create_product(NewProduct {
      name,
      description,
      price_cents: price,
      quantity,
    })
    .await?;
  info!(product_id = %product.id, "Product added.");
  Ok(HttpResponse::Created().json(json!({
    "message": "Product added successfully",
    "product": product,
  })))
}

/// Multipart form with an `id` text field and a `file` part. The file is
/// stored base64-encoded on the product.
#[instrument(name = "handler::admin_upload_picture", skip_all)]
pub async fn upload_picture_handler(
  app_state: web::Data<AppState>,
  _session: AdminSession,
  mut form: Multipart,
) -> AppResult<HttpResponse> {
  let bad_form = |e: actix_multipart::MultipartError| AppError::Validation(format!("Invalid upload: {}", e));
  let mut product_id: Option<String> = None;
  let mut picture: Option<Vec<u8>> = None;

  while let Some(mut field) = form.try_next().await.map_err(bad_form)? {
    let name = field.name().map(str::to_owned);
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(bad_form)? {
      if bytes.len() + chunk.len() > MAX_PICTURE_BYTES {
        return Err(AppError::Validation("Picture exceeds the 5 MB limit".to_string()));
      }
      bytes.extend_from_slice(&chunk);
    }
    match name.as_deref() {
      Some("id") => product_id = Some(String::from_utf8_lossy(&bytes).trim().to_string()),
      Some("file") if !bytes.is_empty() => picture = Some(bytes),
      _ => {}
    }
  }

  let picture = picture.ok_or_else(|| AppError::Validation("Product image is required".to_string()))?;
  let product_id = product_id
    .as_deref()
    .and_then(|id| Uuid::parse_str(id).ok())
    .ok_or_else(|| AppError::Validation("Invalid product ID format".to_string()))?;

  app_state
    .store
    .set_product_picture(product_id, STANDARD.encode(&picture))
    .await?;
  let product = app_state
    .store
    .get_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  info!(%product_id, size = picture.len(), "Product picture uploaded.");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Uploaded successfully",
    "data": product,
  })))
}

#[instrument(name = "handler::admin_edit_product", skip(app_state, _session))]
pub async fn edit_product_handler(
  app_state: web::Data<AppState>,
  _session: AdminSession,
  payload: web::Json<EditProductPayload>,
) -> AppResult<HttpResponse> {
  let EditProductPayload { id, patch } = payload.into_inner();
  let patch = ProductPatch {
    name: non_blank(patch.name),
    description: non_blank(patch.description),
    ..patch
  };
  if patch.is_empty() {
    return Err(AppError::Validation(
      "At least one field must be provided for update".to_string(),
    ));
  }
  if let Some(price) = patch.price_cents {
    validate_price(price)?;
  }
  if let Some(quantity) = patch.quantity {
    validate_quantity(quantity)?;
  }

  let product = app_state.store.update_product(id, &patch).await?;
  Ok(HttpResponse::Ok().json(json!({
    "message": "Product updated successfully",
    "product": product,
  })))
}

#[instrument(name = "handler::admin_delete_product", skip(app_state, _session))]
pub async fn delete_product_handler(
  app_state: web::Data<AppState>,
  _session: AdminSession,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let product_id = path.into_inner();
  app_state.store.delete_product(product_id).await?;
  info!(%product_id, "Product deleted.");
  Ok(HttpResponse::Ok().json(json!({ "message": "Product deleted successfully" })))
}

#[instrument(name = "handler::admin_view_products", skip_all)]
pub async fn view_products_handler(app_state: web::Data<AppState>, _session: AdminSession) -> AppResult<HttpResponse> {
  let products = app_state.store.list_products(&ProductQuery::default()).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::admin_view_orders", skip_all)]
pub async fn view_orders_handler(app_state: web::Data<AppState>, _session: AdminSession) -> AppResult<HttpResponse> {
  let orders = app_state.store.list_all_orders().await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

/// Moves an order forward: Placed to Shipped, Shipped to Delivered.
#[instrument(name = "handler::admin_update_order_status", skip(app_state, _session))]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  _session: AdminSession,
  payload: web::Json<UpdateOrderStatusPayload>,
) -> AppResult<HttpResponse> {
  let order = app_state
    .store
    .update_order_status(payload.order_id, payload.status)
    .await?;
  info!(order_id = %order.id, status = %order.status, "Order status updated.");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Order status updated successfully",
    "order": order,
  })))
}
