// src/store/memory.rs

use super::{
  already_in_status, cart_overflow, positive_quantity, total_out_of_range, StockLine, Store, StoreError, StoreResult,
};
use crate::models::{
  Account, AccountRole, CartItem, CartLine, NewAccount, NewOrder, NewProduct, Order, OrderItem, OrderStatus,
  PriceOrder, Product, ProductPatch, ProductQuery, Review,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
  accounts: HashMap<Uuid, Account>,
  products: Vec<Product>,
  purchasers: HashSet<(Uuid, Uuid)>,
  ratings: Vec<(Uuid, Uuid, i16)>,
  reviews: Vec<Review>,
  carts: HashMap<Uuid, Vec<CartItem>>,
  orders: Vec<Order>,
  revoked: HashMap<Uuid, DateTime<Utc>>,
}

impl MemoryState {
  fn product_mut(&mut self, id: Uuid) -> StoreResult<&mut Product> {
    self.products.iter_mut().find(|p| p.id == id).ok_or(StoreError::NotFound("Product"))
  }

  fn account_mut(&mut self, id: Uuid) -> StoreResult<&mut Account> {
    self.accounts.get_mut(&id).ok_or(StoreError::NotFound("Account"))
  }

  /// Whether `user_id` holds a non-cancelled order containing `product_id`,
  /// ignoring `except_order`.
  fn still_bought(&self, user_id: Uuid, product_id: Uuid, except_order: Option<Uuid>) -> bool {
    self.orders.iter().any(|o| {
      o.user_id == user_id
        && Some(o.id) != except_order
        && o.status != OrderStatus::Cancelled
        && o.items.iter().any(|i| i.product_id == product_id)
    })
  }

  fn restock(&mut self, user_id: Uuid, items: &[OrderItem], except_order: Option<Uuid>) {
    let now = Utc::now();
    for item in items {
      if let Some(product) = self.products.iter_mut().find(|p| p.id == item.product_id) {
        product.quantity += item.quantity;
        product.updated_at = now;
      }
      if !self.still_bought(user_id, item.product_id, except_order) {
        self.purchasers.remove(&(item.product_id, user_id));
      }
    }
  }
}

/// Process-local store. Every operation takes one lock, so multi-row
/// operations are atomic with respect to each other.
#[derive(Default)]
pub struct MemoryStore {
  state: RwLock<MemoryState>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn create_account(&self, new_account: NewAccount) -> StoreResult<Account> {
    let mut state = self.state.write();
    let taken = state
      .accounts
      .values()
      .any(|a| a.role == new_account.role && a.email.eq_ignore_ascii_case(&new_account.email));
    if taken {
      return Err(StoreError::Conflict("Email already exists".to_string()));
    }
    let now = Utc::now();
    let account = Account {
      id: Uuid::new_v4(),
      role: new_account.role,
      email: new_account.email,
      password_hash: new_account.password_hash,
      first_name: new_account.first_name,
      last_name: new_account.last_name,
      mobile: new_account.mobile,
      username: new_account.username,
      reset_otp: None,
      reset_otp_expires_at: None,
      reset_verified_until: None,
      created_at: now,
      updated_at: now,
    };
    state.accounts.insert(account.id, account.clone());
    Ok(account)
  }

  async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
    Ok(self.state.read().accounts.get(&id).cloned())
  }

  async fn find_account_by_email(&self, role: AccountRole, email: &str) -> StoreResult<Option<Account>> {
    Ok(
      self
        .state
        .read()
        .accounts
        .values()
        .find(|a| a.role == role && a.email.eq_ignore_ascii_case(email))
        .cloned(),
    )
  }

  async fn admin_exists(&self) -> StoreResult<bool> {
    Ok(self.state.read().accounts.values().any(|a| a.role == AccountRole::Admin))
  }

  async fn update_password(&self, account_id: Uuid, password_hash: &str) -> StoreResult<()> {
    let mut state = self.state.write();
    let account = state.account_mut(account_id)?;
    account.password_hash = password_hash.to_string();
    account.reset_otp = None;
    account.reset_otp_expires_at = None;
    account.reset_verified_until = None;
    account.updated_at = Utc::now();
    Ok(())
  }

  async fn set_reset_otp(&self, account_id: Uuid, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
    let mut state = self.state.write();
    let account = state.account_mut(account_id)?;
    account.reset_otp = Some(otp.to_string());
    account.reset_otp_expires_at = Some(expires_at);
    account.reset_verified_until = None;
    account.updated_at = Utc::now();
    Ok(())
  }

  async fn mark_reset_verified(&self, account_id: Uuid, until: DateTime<Utc>) -> StoreResult<()> {
    let mut state = self.state.write();
    let account = state.account_mut(account_id)?;
    account.reset_otp = None;
    account.reset_otp_expires_at = None;
    account.reset_verified_until = Some(until);
    account.updated_at = Utc::now();
    Ok(())
  }

  async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
    let mut state = self.state.write();
    let now = Utc::now();
    state.revoked.retain(|_, exp| *exp > now);
    state.revoked.insert(jti, expires_at);
    Ok(())
  }

  async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
    Ok(self.state.read().revoked.contains_key(&jti))
  }

  async fn create_product(&self, new_product: NewProduct) -> StoreResult<Product> {
    let now = Utc::now();
    let product = Product {
      id: Uuid::new_v4(),
      name: new_product.name,
      description: new_product.description,
      price_cents: new_product.price_cents,
      quantity: new_product.quantity,
      picture: None,
      average_rating: 0.0,
      rating_count: 0,
      created_at: now,
      updated_at: now,
    };
    self.state.write().products.push(product.clone());
    Ok(product)
  }

  async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    Ok(self.state.read().products.iter().find(|p| p.id == id).cloned())
  }

  async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
    let mut products: Vec<Product> = self
      .state
      .read()
      .products
      .iter()
      .filter(|p| query.matches(p))
      .cloned()
      .collect();
    match query.order {
      Some(PriceOrder::LowToHigh) => products.sort_by_key(|p| p.price_cents),
      Some(PriceOrder::HighToLow) => products.sort_by_key(|p| std::cmp::Reverse(p.price_cents)),
      None => {}
    }
    Ok(products)
  }

  async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> StoreResult<Product> {
    let mut state = self.state.write();
    let product = state.product_mut(id)?;
    if let Some(name) = &patch.name {
      product.name = name.clone();
    }
    if let Some(description) = &patch.description {
      product.description = description.clone();
    }
    if let Some(price_cents) = patch.price_cents {
      product.price_cents = price_cents;
    }
    if let Some(quantity) = patch.quantity {
      product.quantity = quantity;
    }
    product.updated_at = Utc::now();
    Ok(product.clone())
  }

  async fn set_product_picture(&self, id: Uuid, picture: String) -> StoreResult<()> {
    let mut state = self.state.write();
    let product = state.product_mut(id)?;
    product.picture = Some(picture);
    product.updated_at = Utc::now();
    Ok(())
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
    let mut state = self.state.write();
    let before = state.products.len();
    state.products.retain(|p| p.id != id);
    if state.products.len() == before {
      return Err(StoreError::NotFound("Product"));
    }
    state.purchasers.retain(|(product_id, _)| *product_id != id);
    state.ratings.retain(|(product_id, _, _)| *product_id != id);
    state.reviews.retain(|r| r.product_id != id);
    for lines in state.carts.values_mut() {
      lines.retain(|l| l.product_id != id);
    }
    Ok(())
  }

  async fn is_purchaser(&self, product_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    Ok(self.state.read().purchasers.contains(&(product_id, user_id)))
  }

  async fn add_rating(&self, product_id: Uuid, user_id: Uuid, rating: i16) -> StoreResult<Product> {
    let mut state = self.state.write();
    state.product_mut(product_id)?;
    state.ratings.push((product_id, user_id, rating));
    let (sum, count) = state
      .ratings
      .iter()
      .filter(|(p, _, _)| *p == product_id)
      .fold((0i64, 0i64), |(sum, count), (_, _, r)| (sum + i64::from(*r), count + 1));
    let product = state.product_mut(product_id)?;
    product.average_rating = sum as f64 / count as f64;
    product.rating_count = count;
    product.updated_at = Utc::now();
    Ok(product.clone())
  }

  async fn add_review(&self, product_id: Uuid, user_id: Uuid, review: &str) -> StoreResult<Review> {
    let mut state = self.state.write();
    state.product_mut(product_id)?;
    let review = Review {
      id: Uuid::new_v4(),
      product_id,
      user_id,
      review: review.to_string(),
      created_at: Utc::now(),
    };
    state.reviews.push(review.clone());
    Ok(review)
  }

  async fn list_reviews(&self, product_id: Uuid) -> StoreResult<Vec<Review>> {
    Ok(
      self
        .state
        .read()
        .reviews
        .iter()
        .filter(|r| r.product_id == product_id)
        .cloned()
        .collect(),
    )
  }

  async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
    let state = self.state.read();
    let Some(items) = state.carts.get(&user_id) else {
      return Ok(Vec::new());
    };
    Ok(
      items
        .iter()
        .filter_map(|item| {
          state.products.iter().find(|p| p.id == item.product_id).map(|p| CartLine {
            product_id: p.id,
            name: p.name.clone(),
            price_cents: p.price_cents,
            picture: p.picture.clone(),
            available: p.quantity,
            quantity: item.quantity,
          })
        })
        .collect(),
    )
  }

  async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
    positive_quantity(quantity)?;
    let mut state = self.state.write();
    state.product_mut(product_id)?;
    let now = Utc::now();
    let lines = state.carts.entry(user_id).or_default();
    if let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) {
      line.quantity = line.quantity.checked_add(quantity).ok_or_else(cart_overflow)?;
      line.updated_at = now;
      return Ok(line.clone());
    }
    let line = CartItem {
      user_id,
      product_id,
      quantity,
      added_at: now,
      updated_at: now,
    };
    lines.push(line.clone());
    Ok(line)
  }

  async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
    positive_quantity(quantity)?;
    let mut state = self.state.write();
    let line = state
      .carts
      .get_mut(&user_id)
      .and_then(|lines| lines.iter_mut().find(|l| l.product_id == product_id))
      .ok_or(StoreError::NotFound("Cart item"))?;
    line.quantity = quantity;
    line.updated_at = Utc::now();
    Ok(line.clone())
  }

  async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<()> {
    let mut state = self.state.write();
    let lines = state.carts.get_mut(&user_id).ok_or(StoreError::NotFound("Cart item"))?;
    let before = lines.len();
    lines.retain(|l| l.product_id != product_id);
    if lines.len() == before {
      return Err(StoreError::NotFound("Cart item"));
    }
    Ok(())
  }

  async fn reserve_stock(&self, user_id: Uuid, lines: &[StockLine]) -> StoreResult<Vec<OrderItem>> {
    let mut state = self.state.write();

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
      positive_quantity(line.quantity)?;
      let product = state
        .products
        .iter()
        .find(|p| p.id == line.product_id)
        .ok_or(StoreError::NotFound("Product"))?;
      if product.quantity < line.quantity {
        return Err(StoreError::InsufficientStock {
          product_id: product.id,
          product_name: product.name.clone(),
        });
      }
      items.push(OrderItem {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity: line.quantity,
        price_cents: product.price_cents,
      });
    }

    let now = Utc::now();
    for item in &items {
      let product = state.product_mut(item.product_id)?;
      product.quantity -= item.quantity;
      product.updated_at = now;
      state.purchasers.insert((item.product_id, user_id));
    }
    Ok(items)
  }

  async fn release_stock(&self, user_id: Uuid, items: &[OrderItem]) -> StoreResult<()> {
    self.state.write().restock(user_id, items, None);
    Ok(())
  }

  async fn create_order(&self, new_order: NewOrder) -> StoreResult<Order> {
    let now = Utc::now();
    let total_cents = new_order.total_cents().ok_or_else(total_out_of_range)?;
    let order = Order {
      id: new_order.id,
      user_id: new_order.user_id,
      total_cents,
      delivery_date: new_order.delivery_date(),
      items: new_order.items,
      status: OrderStatus::Placed,
      payment_method: new_order.payment_method,
      payment_reference: new_order.payment_reference,
      order_date: new_order.order_date,
      updated_at: now,
    };
    let mut state = self.state.write();
    state.orders.push(order.clone());
    state.carts.remove(&order.user_id);
    Ok(order)
  }

  async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    Ok(self.state.read().orders.iter().find(|o| o.id == id).cloned())
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    let mut orders: Vec<Order> = self
      .state
      .read()
      .orders
      .iter()
      .filter(|o| o.user_id == user_id)
      .cloned()
      .collect();
    orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
    Ok(orders)
  }

  async fn list_all_orders(&self) -> StoreResult<Vec<Order>> {
    let mut orders = self.state.read().orders.clone();
    orders.sort_by(|a, b| b.order_date.cmp(&a.order_date));
    Ok(orders)
  }

  async fn cancel_order(&self, order_id: Uuid) -> StoreResult<Order> {
    let mut state = self.state.write();
    let order = state
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or(StoreError::NotFound("Order"))?;
    if !order.status.is_cancellable() {
      return Err(already_in_status(order.status));
    }
    order.status = OrderStatus::Cancelled;
    order.updated_at = Utc::now();
    let cancelled = order.clone();
    state.restock(cancelled.user_id, &cancelled.items, Some(cancelled.id));
    Ok(cancelled)
  }

  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> StoreResult<Order> {
    let mut state = self.state.write();
    let order = state
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or(StoreError::NotFound("Order"))?;
    if !order.status.can_advance_to(status) {
      return Err(StoreError::InvalidTransition {
        from: order.status,
        to: status,
      });
    }
    order.status = status;
    order.updated_at = Utc::now();
    Ok(order.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::PaymentMethod;

  async fn store_with_product(quantity: i32) -> (MemoryStore, Product) {
    let store = MemoryStore::new();
    let product = store
      .create_product(NewProduct {
        name: "Kettle".into(),
        description: "Steel".into(),
        price_cents: 2500,
        quantity,
      })
      .await
      .unwrap();
    (store, product)
  }

  #[actix_rt::test]
  async fn reserve_is_all_or_nothing() {
    let (store, kettle) = store_with_product(5).await;
    let cup = store
      .create_product(NewProduct {
        name: "Cup".into(),
        description: String::new(),
        price_cents: 300,
        quantity: 1,
      })
      .await
      .unwrap();
    let user = Uuid::new_v4();

    let err = store
      .reserve_stock(
        user,
        &[
          StockLine {
            product_id: kettle.id,
            quantity: 2,
          },
          StockLine {
            product_id: cup.id,
            quantity: 3,
          },
        ],
      )
      .await
      .unwrap_err();

    assert!(matches!(err, StoreError::InsufficientStock { product_id, .. } if product_id == cup.id));
    assert_eq!(store.get_product(kettle.id).await.unwrap().unwrap().quantity, 5);
    assert_eq!(store.get_product(cup.id).await.unwrap().unwrap().quantity, 1);
    assert!(!store.is_purchaser(kettle.id, user).await.unwrap());
  }

  #[actix_rt::test]
  async fn cancel_keeps_purchaser_with_other_live_order() {
    let (store, kettle) = store_with_product(10).await;
    let user = Uuid::new_v4();
    let line = [StockLine {
      product_id: kettle.id,
      quantity: 1,
    }];

    let mut order_ids = Vec::new();
    for _ in 0..2 {
      let items = store.reserve_stock(user, &line).await.unwrap();
      let order = store
        .create_order(NewOrder {
          id: Uuid::new_v4(),
          user_id: user,
          items,
          payment_method: PaymentMethod::Cash,
          payment_reference: None,
          order_date: Utc::now(),
        })
        .await
        .unwrap();
      order_ids.push(order.id);
    }

    store.cancel_order(order_ids[0]).await.unwrap();
    assert!(store.is_purchaser(kettle.id, user).await.unwrap());
    assert_eq!(store.get_product(kettle.id).await.unwrap().unwrap().quantity, 9);

    store.cancel_order(order_ids[1]).await.unwrap();
    assert!(!store.is_purchaser(kettle.id, user).await.unwrap());
    assert_eq!(store.get_product(kettle.id).await.unwrap().unwrap().quantity, 10);

    let err = store.cancel_order(order_ids[1]).await.unwrap_err();
    assert_eq!(err.to_string(), "Order is already cancelled");
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn concurrent_reservations_never_oversell() {
    let (store, kettle) = store_with_product(3).await;
    let store = std::sync::Arc::new(store);
    let kettle_id = kettle.id;

    let attempts: Vec<_> = (0..8)
      .map(|_| {
        let store = store.clone();
        tokio::spawn(async move {
          let line = [StockLine {
            product_id: kettle_id,
            quantity: 1,
          }];
          store.reserve_stock(Uuid::new_v4(), &line).await.is_ok()
        })
      })
      .collect();

    let mut reserved = 0;
    for attempt in attempts {
      if attempt.await.unwrap() {
        reserved += 1;
      }
    }
    assert_eq!(reserved, 3);
    assert_eq!(store.get_product(kettle_id).await.unwrap().unwrap().quantity, 0);
  }

  #[actix_rt::test]
  async fn add_to_cart_accumulates() {
    let (store, kettle) = store_with_product(10).await;
    let user = Uuid::new_v4();
    store.add_to_cart(user, kettle.id, 2).await.unwrap();
    let line = store.add_to_cart(user, kettle.id, 3).await.unwrap();
    assert_eq!(line.quantity, 5);
    assert_eq!(store.cart_lines(user).await.unwrap().len(), 1);
  }

  #[actix_rt::test]
  async fn cart_quantities_stay_positive_and_in_range() {
    let (store, kettle) = store_with_product(10).await;
    let user = Uuid::new_v4();
    store.add_to_cart(user, kettle.id, 1).await.unwrap();

    let err = store.add_to_cart(user, kettle.id, i32::MAX).await.unwrap_err();
    assert!(matches!(err, StoreError::OutOfRange(_)));
    for bad in [0, -3] {
      assert!(matches!(store.add_to_cart(user, kettle.id, bad).await, Err(StoreError::OutOfRange(_))));
      assert!(matches!(store.set_cart_quantity(user, kettle.id, bad).await, Err(StoreError::OutOfRange(_))));
    }
    let reserve = store
      .reserve_stock(
        user,
        &[StockLine {
          product_id: kettle.id,
          quantity: -4,
        }],
      )
      .await;
    assert!(matches!(reserve, Err(StoreError::OutOfRange(_))));

    let lines = store.cart_lines(user).await.unwrap();
    assert_eq!(lines[0].quantity, 1);
    assert_eq!(store.get_product(kettle.id).await.unwrap().unwrap().quantity, 10);
  }

  #[actix_rt::test]
  async fn create_order_rejects_an_overflowing_total() {
    let store = MemoryStore::new();
    let err = store
      .create_order(NewOrder {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        items: vec![OrderItem {
          product_id: Uuid::new_v4(),
          product_name: "Vault".into(),
          quantity: 2,
          price_cents: i64::MAX,
        }],
        payment_method: PaymentMethod::Cash,
        payment_reference: None,
        order_date: Utc::now(),
      })
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::OutOfRange(_)));
    assert!(store.list_all_orders().await.unwrap().is_empty());
  }
}
