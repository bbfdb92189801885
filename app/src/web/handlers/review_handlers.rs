// src/web/handlers/review_handlers.rs

//! Ratings and reviews. Only recorded purchasers may submit either.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::state::AppState;
use crate::web::session::UserSession;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RatePayload {
  pub product_id: Uuid,
  pub rating: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPayload {
  pub product_id: Uuid,
  pub review: String,
}

async fn ensure_purchaser(app_state: &AppState, product_id: Uuid, user_id: Uuid) -> AppResult<()> {
  if app_state.store.get_product(product_id).await?.is_none() {
    return Err(AppError::NotFound("Product not found".to_string()));
  }
  if !app_state.store.is_purchaser(product_id, user_id).await? {
    warn!(%product_id, %user_id, "Non-purchaser tried to rate or review.");
    return Err(AppError::Forbidden(
      "Only customers who purchased this product can rate or review it".to_string(),
    ));
  }
  Ok(())
}

#[instrument(name = "handler::rate_product", skip(app_state, session), fields(user_id = %session.0.account_id))]
pub async fn rate_product_handler(
  app_state: web::Data<AppState>,
  session: UserSession,
  payload: web::Json<RatePayload>,
) -> AppResult<HttpResponse> {
  let rating = i16::try_from(payload.rating)
    .ok()
    .filter(|r| (0..=5).contains(r))
    .ok_or_else(|| AppError::Validation("Rating must be a whole number between 0 and 5".to_string()))?;
  ensure_purchaser(&app_state, payload.product_id, session.0.account_id).await?;

  let product = app_state
    .store
    .add_rating(payload.product_id, session.0.account_id, rating)
    .await?;
  info!(product_id = %product.id, average = product.average_rating, "Rating recorded.");
  Ok(HttpResponse::Ok().json(json!({
    "message": "Product rated successfully",
    "averageRating": product.average_rating,
    "ratingCount": product.rating_count,
  })))
}

#[instrument(name = "handler::review_product", skip(app_state, session, payload), fields(user_id = %session.0.account_id))]
pub async fn review_product_handler(
  app_state: web::Data<AppState>,
  session: UserSession,
  payload: web::Json<ReviewPayload>,
) -> AppResult<HttpResponse> {
  let text = payload.review.trim();
  if text.is_empty() {
    return Err(AppError::Validation("Review cannot be empty".to_string()));
  }
  ensure_purchaser(&app_state, payload.product_id, session.0.account_id).await?;

  let review = app_state
    .store
    .add_review(payload.product_id, session.0.account_id, text)
    .await?;
  Ok(HttpResponse::Created().json(json!({
    "message": "Review added successfully",
    "review": review,
  })))
}
