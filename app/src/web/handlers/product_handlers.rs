// src/web/handlers/product_handlers.rs

//! Catalog browsing for signed-in shoppers.

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::{AppError, Result as AppResult};
use crate::models::{PriceOrder, ProductDetail, ProductQuery};
use crate::state::AppState;
use crate::web::session::UserSession;

#[derive(Deserialize, Debug)]
pub struct SearchQuery {
  pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
  /// Cents.
  pub min_price: Option<i64>,
  /// Cents.
  pub max_price: Option<i64>,
  pub average_rating: Option<f64>,
}

#[derive(Deserialize, Debug)]
pub struct SortQuery {
  pub order: Option<String>,
}

impl FilterQuery {
  fn into_product_query(self) -> AppResult<ProductQuery> {
    if self.min_price.is_some_and(|p| p < 0) || self.max_price.is_some_and(|p| p < 0) {
      return Err(AppError::Validation("Prices cannot be negative".to_string()));
    }
    if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
      if min > max {
        return Err(AppError::Validation("minPrice cannot exceed maxPrice".to_string()));
      }
    }
    if self.average_rating.is_some_and(|r| !(0.0..=5.0).contains(&r)) {
      return Err(AppError::Validation("Invalid average rating".to_string()));
    }
    Ok(ProductQuery {
      min_price_cents: self.min_price,
      max_price_cents: self.max_price,
      min_average_rating: self.average_rating,
      ..ProductQuery::default()
    })
  }
}

fn parse_price_order(order: Option<&str>) -> AppResult<PriceOrder> {
  match order.map(str::trim) {
    Some("low") => Ok(PriceOrder::LowToHigh),
    Some("high") => Ok(PriceOrder::HighToLow),
    _ => Err(AppError::Validation(
      "Invalid sort order. Use 'low' or 'high'".to_string(),
    )),
  }
}

#[instrument(name = "handler::view_products", skip_all)]
pub async fn view_products_handler(app_state: web::Data<AppState>, _session: UserSession) -> AppResult<HttpResponse> {
  let products = app_state.store.list_products(&ProductQuery::default()).await?;
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::get_product", skip(app_state, _session))]
pub async fn get_product_handler(
  app_state: web::Data<AppState>,
  _session: UserSession,
  path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
  let product_id = path.into_inner();
  let product = app_state
    .store
    .get_product(product_id)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
  let reviews = app_state.store.list_reviews(product_id).await?;
  Ok(HttpResponse::Ok().json(ProductDetail { product, reviews }))
}

#[instrument(name = "handler::search_products", skip(app_state, _session))]
pub async fn search_products_handler(
  app_state: web::Data<AppState>,
  _session: UserSession,
  query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
  let name = query
    .name
    .as_deref()
    .map(str::trim)
    .filter(|n| !n.is_empty())
    .ok_or_else(|| AppError::Validation("Invalid product name".to_string()))?;

  let products = app_state
    .store
    .list_products(&ProductQuery {
      name_contains: Some(name.to_string()),
      ..ProductQuery::default()
    })
    .await?;
  if products.is_empty() {
    return Err(AppError::NotFound("No products found".to_string()));
  }
  info!(matches = products.len(), "Product search served.");
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::filter_products", skip(app_state, _session))]
pub async fn filter_products_handler(
  app_state: web::Data<AppState>,
  _session: UserSession,
  query: web::Query<FilterQuery>,
) -> AppResult<HttpResponse> {
  let product_query = query.into_inner().into_product_query()?;
  let products = app_state.store.list_products(&product_query).await?;
  if products.is_empty() {
    return Err(AppError::NotFound("No products match the given filters".to_string()));
  }
  Ok(HttpResponse::Ok().json(products))
}

#[instrument(name = "handler::sort_products", skip(app_state, _session))]
pub async fn sort_products_handler(
  app_state: web::Data<AppState>,
  _session: UserSession,
  query: web::Query<SortQuery>,
) -> AppResult<HttpResponse> {
  let order = parse_price_order(query.order.as_deref())?;
  let products = app_state
    .store
    .list_products(&ProductQuery {
      order: Some(order),
      ..ProductQuery::default()
    })
    .await?;
  Ok(HttpResponse::Ok().json(products))
}
