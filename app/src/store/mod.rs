// src/store/mod.rs

//! Persistence boundary. Handlers and workflow steps only see `dyn Store`;
//! `postgres` backs production and `memory` backs local runs and tests.

pub mod memory;
pub mod postgres;

use crate::models::{
  Account, AccountRole, CartItem, CartLine, NewAccount, NewOrder, NewProduct, Order, OrderItem, OrderStatus, Product,
  ProductPatch, ProductQuery, Review,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("{0}")]
  Conflict(String),

  /// A quantity or amount that is non-positive or does not fit its column.
  #[error("{0}")]
  OutOfRange(String),

  #[error("insufficient stock for product {product_name} ({product_id})")]
  InsufficientStock { product_id: Uuid, product_name: String },

  #[error("invalid order status transition from {from} to {to}")]
  InvalidTransition { from: OrderStatus, to: OrderStatus },

  #[error("database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("migration error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A requested product quantity, as taken from a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[async_trait]
pub trait Store: Send + Sync {
  // --- accounts ---
  /// Fails with `Conflict` when the role already has an account with this email.
  async fn create_account(&self, new_account: NewAccount) -> StoreResult<Account>;
  async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
  async fn find_account_by_email(&self, role: AccountRole, email: &str) -> StoreResult<Option<Account>>;
  async fn admin_exists(&self) -> StoreResult<bool>;
  /// Replaces the password hash and clears any reset state.
  async fn update_password(&self, account_id: Uuid, password_hash: &str) -> StoreResult<()>;
  async fn set_reset_otp(&self, account_id: Uuid, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;
  /// Consumes the OTP and opens the password-reset window.
  async fn mark_reset_verified(&self, account_id: Uuid, until: DateTime<Utc>) -> StoreResult<()>;

  // --- token blacklist ---
  async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()>;
  async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool>;

  // --- catalog ---
  async fn create_product(&self, new_product: NewProduct) -> StoreResult<Product>;
  async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
  async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>>;
  async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> StoreResult<Product>;
  async fn set_product_picture(&self, id: Uuid, picture: String) -> StoreResult<()>;
  async fn delete_product(&self, id: Uuid) -> StoreResult<()>;
  async fn is_purchaser(&self, product_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
  /// Appends a rating and recomputes the product's average over all ratings.
  async fn add_rating(&self, product_id: Uuid, user_id: Uuid, rating: i16) -> StoreResult<Product>;
  async fn add_review(&self, product_id: Uuid, user_id: Uuid, review: &str) -> StoreResult<Review>;
  async fn list_reviews(&self, product_id: Uuid) -> StoreResult<Vec<Review>>;

  // --- cart ---
  async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>>;
  /// Adds `quantity` to the existing line, or creates one.
  async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem>;
  async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem>;
  async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<()>;

  // --- orders ---
  /// Checks and decrements stock for every line in one atomic operation and
  /// records the buyer as a purchaser. Either all lines are reserved or none.
  /// Returns the lines priced at the current product price.
  async fn reserve_stock(&self, user_id: Uuid, lines: &[StockLine]) -> StoreResult<Vec<OrderItem>>;
  /// Undoes `reserve_stock` for an order that was never persisted.
  async fn release_stock(&self, user_id: Uuid, items: &[OrderItem]) -> StoreResult<()>;
  /// Persists the order and empties the buyer's cart.
  async fn create_order(&self, new_order: NewOrder) -> StoreResult<Order>;
  async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
  async fn list_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
  async fn list_all_orders(&self) -> StoreResult<Vec<Order>>;
  /// Flips a placed order to cancelled, restores its stock and drops the
  /// buyer from purchaser lists they no longer qualify for. Fails with
  /// `Conflict` if the order is no longer placed.
  async fn cancel_order(&self, order_id: Uuid) -> StoreResult<Order>;
  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> StoreResult<Order>;
}

pub(crate) fn already_in_status(status: OrderStatus) -> StoreError {
  StoreError::Conflict(format!("Order is already {}", status.to_string().to_lowercase()))
}

pub(crate) fn positive_quantity(quantity: i32) -> StoreResult<i32> {
  if quantity <= 0 {
    return Err(StoreError::OutOfRange("Quantity must be at least 1".to_string()));
  }
  Ok(quantity)
}

pub(crate) fn cart_overflow() -> StoreError {
  StoreError::OutOfRange("Cart quantity is too large".to_string())
}

pub(crate) fn total_out_of_range() -> StoreError {
  StoreError::OutOfRange("Order total is out of range".to_string())
}

/// Fills an empty catalog with a few demo products.
pub async fn seed_catalog(store: &dyn Store) -> StoreResult<usize> {
  if !store.list_products(&ProductQuery::default()).await?.is_empty() {
    return Ok(0);
  }
  let demo = [
    ("Ceramic Mug", "Stoneware mug, 350 ml.", 1250, 40),
    ("Pour-over Kettle", "Gooseneck kettle for slow brewing.", 4599, 12),
    ("Linen Apron", "Washed linen, adjustable straps.", 2900, 25),
    ("Loose Leaf Sampler", "Six single-origin teas.", 1899, 60),
  ];
  for (name, description, price_cents, quantity) in demo {
    store
      .create_product(NewProduct {
        name: name.to_string(),
        description: description.to_string(),
        price_cents,
        quantity,
      })
      .await?;
  }
  Ok(demo.len())
}
