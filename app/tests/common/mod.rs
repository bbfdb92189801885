// tests/common/mod.rs
#![allow(dead_code)]

use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use marketplace_hub::config::AppConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use marketplace_hub::models::{
  Account, AccountRole, CartItem, CartLine, NewAccount, NewOrder, NewProduct, Order, OrderItem, OrderStatus,
  PaymentMethod, Product, ProductPatch, ProductQuery, Review,
};
use marketplace_hub::services::auth_service;
use marketplace_hub::services::notifier::RecordingNotifier;
use marketplace_hub::services::payment::MockGateway;
use marketplace_hub::services::token_service::TokenKind;
use marketplace_hub::state::AppState;
use marketplace_hub::store::{MemoryStore, StockLine, Store, StoreResult};
use uuid::Uuid;
use std::sync::Arc;

pub const PASSWORD: &str = "password123";

/// Shared state plus typed handles on the test doubles behind it.
pub struct Harness {
  pub state: AppState,
  pub notifier: Arc<RecordingNotifier>,
  pub payments: Arc<MockGateway>,
}

pub fn setup_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

pub fn harness_with(payments: MockGateway, notifier: RecordingNotifier) -> Harness {
  harness_on(Arc::new(MemoryStore::new()), payments, notifier)
}

pub fn harness_on(store: Arc<dyn Store>, payments: MockGateway, notifier: RecordingNotifier) -> Harness {
  setup_tracing();
  let notifier = Arc::new(notifier);
  let payments = Arc::new(payments);
  let state = AppState::new(
    store,
    Arc::new(AppConfig::with_secrets("test-access-secret", "test-refresh-secret")),
    notifier.clone(),
    payments.clone(),
  );
  Harness {
    state,
    notifier,
    payments,
  }
}

pub fn harness() -> Harness {
  harness_with(MockGateway::new(), RecordingNotifier::new())
}

/// Builds the full application service around a harness.
#[macro_export]
macro_rules! app {
  ($harness:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($harness.state.clone()))
        .configure(marketplace_hub::web::configure_app_routes),
    )
    .await
  };
}

impl Harness {
  pub fn store(&self) -> &Arc<dyn Store> {
    &self.state.store
  }

  pub async fn user(&self, email: &str) -> Account {
    self
      .store()
      .create_account(NewAccount {
        role: AccountRole::User,
        email: email.to_string(),
        password_hash: auth_service::hash_password(PASSWORD).unwrap(),
        first_name: Some("Test".to_string()),
        last_name: Some("Shopper".to_string()),
        mobile: None,
        username: None,
      })
      .await
      .unwrap()
  }

  pub async fn admin(&self, email: &str) -> Account {
    self
      .store()
      .create_account(NewAccount {
        role: AccountRole::Admin,
        email: email.to_string(),
        password_hash: auth_service::hash_password(PASSWORD).unwrap(),
        first_name: None,
        last_name: None,
        mobile: None,
        username: Some("root".to_string()),
      })
      .await
      .unwrap()
  }

  pub async fn product(&self, name: &str, price_cents: i64, quantity: i32) -> Product {
    self
      .store()
      .create_product(NewProduct {
        name: name.to_string(),
        description: format!("{} description", name),
        price_cents,
        quantity,
      })
      .await
      .unwrap()
  }

  pub async fn stock_of(&self, product_id: uuid::Uuid) -> i32 {
    self.store().get_product(product_id).await.unwrap().unwrap().quantity
  }

  /// Places a cash order for `quantity` units straight through the store.
  pub async fn purchase(&self, buyer: &Account, product: &Product, quantity: i32) -> Order {
    let items = self
      .store()
      .reserve_stock(
        buyer.id,
        &[StockLine {
          product_id: product.id,
          quantity,
        }],
      )
      .await
      .unwrap();
    self
      .store()
      .create_order(NewOrder {
        id: uuid::Uuid::new_v4(),
        user_id: buyer.id,
        items,
        payment_method: PaymentMethod::Cash,
        payment_reference: None,
        order_date: chrono::Utc::now(),
      })
      .await
      .unwrap()
  }

  /// An access cookie for `account`, as issued at login.
  pub fn access_cookie(&self, account: &Account) -> Cookie<'static> {
    let issued = self
      .state
      .tokens
      .issue(TokenKind::Access, account.id, &account.email, account.role)
      .unwrap();
    Cookie::new("token", issued.token)
  }

  pub fn refresh_cookie(&self, account: &Account) -> Cookie<'static> {
    let issued = self
      .state
      .tokens
      .issue(TokenKind::Refresh, account.id, &account.email, account.role)
      .unwrap();
    Cookie::new("refreshToken", issued.token)
  }
}

pub fn response_cookie<B>(resp: &ServiceResponse<B>, name: &str) -> Option<Cookie<'static>> {
  resp.response().cookies().find(|c| c.name() == name).map(|c| c.into_owned())
}

/// A memory store where every order is shipped by an admin in the instant
/// between the buyer's status check and the cancel itself.
#[derive(Default)]
pub struct ShipsBeforeCancelStore {
  inner: MemoryStore,
}

#[async_trait]
impl Store for ShipsBeforeCancelStore {
  async fn create_account(&self, new_account: NewAccount) -> StoreResult<Account> {
    self.inner.create_account(new_account).await
  }
  async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
    self.inner.find_account(id).await
  }
  async fn find_account_by_email(&self, role: AccountRole, email: &str) -> StoreResult<Option<Account>> {
    self.inner.find_account_by_email(role, email).await
  }
  async fn admin_exists(&self) -> StoreResult<bool> {
    self.inner.admin_exists().await
  }
  async fn update_password(&self, account_id: Uuid, password_hash: &str) -> StoreResult<()> {
    self.inner.update_password(account_id, password_hash).await
  }
  async fn set_reset_otp(&self, account_id: Uuid, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
    self.inner.set_reset_otp(account_id, otp, expires_at).await
  }
  async fn mark_reset_verified(&self, account_id: Uuid, until: DateTime<Utc>) -> StoreResult<()> {
    self.inner.mark_reset_verified(account_id, until).await
  }
  async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
    self.inner.revoke_token(jti, expires_at).await
  }
  async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
    self.inner.is_token_revoked(jti).await
  }
  async fn create_product(&self, new_product: NewProduct) -> StoreResult<Product> {
    self.inner.create_product(new_product).await
  }
  async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    self.inner.get_product(id).await
  }
  async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
    self.inner.list_products(query).await
  }
  async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> StoreResult<Product> {
    self.inner.update_product(id, patch).await
  }
  async fn set_product_picture(&self, id: Uuid, picture: String) -> StoreResult<()> {
    self.inner.set_product_picture(id, picture).await
  }
  async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
    self.inner.delete_product(id).await
  }
  async fn is_purchaser(&self, product_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    self.inner.is_purchaser(product_id, user_id).await
  }
  async fn add_rating(&self, product_id: Uuid, user_id: Uuid, rating: i16) -> StoreResult<Product> {
    self.inner.add_rating(product_id, user_id, rating).await
  }
  async fn add_review(&self, product_id: Uuid, user_id: Uuid, review: &str) -> StoreResult<Review> {
    self.inner.add_review(product_id, user_id, review).await
  }
  async fn list_reviews(&self, product_id: Uuid) -> StoreResult<Vec<Review>> {
    self.inner.list_reviews(product_id).await
  }
  async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
    self.inner.cart_lines(user_id).await
  }
  async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
    self.inner.add_to_cart(user_id, product_id, quantity).await
  }
  async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
    self.inner.set_cart_quantity(user_id, product_id, quantity).await
  }
  async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<()> {
    self.inner.remove_from_cart(user_id, product_id).await
  }
  async fn reserve_stock(&self, user_id: Uuid, lines: &[StockLine]) -> StoreResult<Vec<OrderItem>> {
    self.inner.reserve_stock(user_id, lines).await
  }
  async fn release_stock(&self, user_id: Uuid, items: &[OrderItem]) -> StoreResult<()> {
    self.inner.release_stock(user_id, items).await
  }
  async fn create_order(&self, new_order: NewOrder) -> StoreResult<Order> {
    self.inner.create_order(new_order).await
  }
  async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    self.inner.get_order(id).await
  }
  async fn list_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    self.inner.list_orders_for_user(user_id).await
  }
  async fn list_all_orders(&self) -> StoreResult<Vec<Order>> {
    self.inner.list_all_orders().await
  }
  async fn cancel_order(&self, order_id: Uuid) -> StoreResult<Order> {
    self.inner.update_order_status(order_id, OrderStatus::Shipped).await?;
    self.inner.cancel_order(order_id).await
  }
  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> StoreResult<Order> {
    self.inner.update_order_status(order_id, status).await
  }
}
