// src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Upper bound on a unit price: one million in the store currency.
pub const MAX_PRICE_CENTS: i64 = 100_000_000;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: String,
  /// Unit price in cents.
  #[serde(rename = "price")]
  pub price_cents: i64,
  pub quantity: i32,
  pub picture: Option<String>,
  pub average_rating: f64,
  pub rating_count: i64,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
  pub id: Uuid,
  pub product_id: Uuid,
  pub user_id: Uuid,
  pub review: String,
  pub created_at: DateTime<Utc>,
}

/// A product with its reviews, as shown on the product page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
  #[serde(flatten)]
  pub product: Product,
  pub reviews: Vec<Review>,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
  pub name: String,
  pub description: String,
  pub price_cents: i64,
  pub quantity: i32,
}

/// Fields an admin may change. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
  pub name: Option<String>,
  pub description: Option<String>,
  #[serde(rename = "price")]
  pub price_cents: Option<i64>,
  pub quantity: Option<i32>,
}

impl ProductPatch {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.description.is_none() && self.price_cents.is_none() && self.quantity.is_none()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceOrder {
  LowToHigh,
  HighToLow,
}

/// Catalog listing filters. Everything unset lists the whole catalog,
/// oldest first.
#[derive(Debug, Clone, Default)]
pub struct ProductQuery {
  pub name_contains: Option<String>,
  pub min_price_cents: Option<i64>,
  pub max_price_cents: Option<i64>,
  pub min_average_rating: Option<f64>,
  pub order: Option<PriceOrder>,
}

impl ProductQuery {
  pub fn matches(&self, product: &Product) -> bool {
    if let Some(needle) = &self.name_contains {
      if !product.name.to_lowercase().contains(&needle.to_lowercase()) {
        return false;
      }
    }
    if self.min_price_cents.is_some_and(|min| product.price_cents < min) {
      return false;
    }
    if self.max_price_cents.is_some_and(|max| product.price_cents > max) {
      return false;
    }
    if self.min_average_rating.is_some_and(|min| product.average_rating < min) {
      return false;
    }
    true
  }
}
