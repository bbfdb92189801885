// src/store/postgres.rs

use super::{
  already_in_status, cart_overflow, positive_quantity, total_out_of_range, StockLine, Store, StoreError, StoreResult,
};
use crate::models::{
  Account, AccountRole, CartItem, CartLine, NewAccount, NewOrder, NewProduct, Order, OrderItem, OrderStatus,
  PriceOrder, Product, ProductPatch, ProductQuery, Review,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, role, email, password_hash, first_name, last_name, mobile, username, \
  reset_otp, reset_otp_expires_at, reset_verified_until, created_at, updated_at";
const PRODUCT_COLUMNS: &str =
  "id, name, description, price_cents, quantity, picture, average_rating, rating_count, created_at, updated_at";
const ORDER_COLUMNS: &str =
  "id, user_id, total_cents, status, payment_method, payment_reference, order_date, delivery_date, updated_at";

#[derive(FromRow)]
struct OrderItemRow {
  order_id: Uuid,
  #[sqlx(flatten)]
  item: OrderItem,
}

#[derive(FromRow)]
struct LockedProduct {
  id: Uuid,
  name: String,
  price_cents: i64,
  quantity: i32,
}

pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str) -> StoreResult<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(10)
      .min_connections(1)
      .acquire_timeout(Duration::from_secs(10))
      .connect(database_url)
      .await?;
    info!("Connected to PostgreSQL.");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }

  async fn attach_items<'e, E>(executor: E, mut orders: Vec<Order>) -> StoreResult<Vec<Order>>
  where
    E: sqlx::PgExecutor<'e>,
  {
    if orders.is_empty() {
      return Ok(orders);
    }
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows: Vec<OrderItemRow> = sqlx::query_as(
      "SELECT order_id, product_id, product_name, quantity, price_cents \
       FROM order_items WHERE order_id = ANY($1) ORDER BY product_name",
    )
    .bind(&ids)
    .fetch_all(executor)
    .await?;

    let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
      by_order.entry(row.order_id).or_default().push(row.item);
    }
    for order in &mut orders {
      order.items = by_order.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
  }

  /// Puts stock back and drops purchaser rows that no other live order of
  /// the same user justifies.
  async fn restock(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    items: &[OrderItem],
    except_order: Uuid,
  ) -> StoreResult<()> {
    for item in items {
      sqlx::query("UPDATE products SET quantity = quantity + $2, updated_at = NOW() WHERE id = $1")
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut **tx)
        .await?;
      sqlx::query(
        "DELETE FROM product_purchasers pp WHERE pp.product_id = $1 AND pp.user_id = $2 \
         AND NOT EXISTS ( \
           SELECT 1 FROM orders o JOIN order_items oi ON oi.order_id = o.id \
           WHERE o.user_id = $2 AND oi.product_id = $1 AND o.status <> 'cancelled' AND o.id <> $3)",
      )
      .bind(item.product_id)
      .bind(user_id)
      .bind(except_order)
      .execute(&mut **tx)
      .await?;
    }
    Ok(())
  }
}

fn escape_like(input: &str) -> String {
  let mut escaped = String::with_capacity(input.len());
  for c in input.chars() {
    if matches!(c, '\\' | '%' | '_') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}

#[async_trait]
impl Store for PgStore {
  #[instrument(skip(self, new_account), fields(role = %new_account.role), err(Display))]
  async fn create_account(&self, new_account: NewAccount) -> StoreResult<Account> {
    let sql = format!(
      "INSERT INTO accounts (id, role, email, password_hash, first_name, last_name, mobile, username) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {ACCOUNT_COLUMNS}"
    );
    let result = sqlx::query_as::<_, Account>(&sql)
      .bind(Uuid::new_v4())
      .bind(new_account.role)
      .bind(&new_account.email)
      .bind(&new_account.password_hash)
      .bind(&new_account.first_name)
      .bind(&new_account.last_name)
      .bind(&new_account.mobile)
      .bind(&new_account.username)
      .fetch_one(&self.pool)
      .await;
    match result {
      Ok(account) => Ok(account),
      Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
        Err(StoreError::Conflict("Email already exists".to_string()))
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn find_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  async fn find_account_by_email(&self, role: AccountRole, email: &str) -> StoreResult<Option<Account>> {
    let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = $1 AND lower(email) = lower($2)");
    Ok(sqlx::query_as(&sql).bind(role).bind(email).fetch_optional(&self.pool).await?)
  }

  async fn admin_exists(&self) -> StoreResult<bool> {
    Ok(
      sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE role = 'admin')")
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn update_password(&self, account_id: Uuid, password_hash: &str) -> StoreResult<()> {
    let result = sqlx::query(
      "UPDATE accounts SET password_hash = $2, reset_otp = NULL, reset_otp_expires_at = NULL, \
       reset_verified_until = NULL, updated_at = NOW() WHERE id = $1",
    )
    .bind(account_id)
    .bind(password_hash)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Account"));
    }
    Ok(())
  }

  async fn set_reset_otp(&self, account_id: Uuid, otp: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
    let result = sqlx::query(
      "UPDATE accounts SET reset_otp = $2, reset_otp_expires_at = $3, reset_verified_until = NULL, \
       updated_at = NOW() WHERE id = $1",
    )
    .bind(account_id)
    .bind(otp)
    .bind(expires_at)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Account"));
    }
    Ok(())
  }

  async fn mark_reset_verified(&self, account_id: Uuid, until: DateTime<Utc>) -> StoreResult<()> {
    let result = sqlx::query(
      "UPDATE accounts SET reset_otp = NULL, reset_otp_expires_at = NULL, reset_verified_until = $2, \
       updated_at = NOW() WHERE id = $1",
    )
    .bind(account_id)
    .bind(until)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Account"));
    }
    Ok(())
  }

  async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>) -> StoreResult<()> {
    sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
      .execute(&self.pool)
      .await?;
    sqlx::query("INSERT INTO revoked_tokens (jti, expires_at) VALUES ($1, $2) ON CONFLICT (jti) DO NOTHING")
      .bind(jti)
      .bind(expires_at)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
    Ok(
      sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)")
        .bind(jti)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn create_product(&self, new_product: NewProduct) -> StoreResult<Product> {
    let sql = format!(
      "INSERT INTO products (id, name, description, price_cents, quantity) VALUES ($1, $2, $3, $4, $5) \
       RETURNING {PRODUCT_COLUMNS}"
    );
    Ok(
      sqlx::query_as(&sql)
        .bind(Uuid::new_v4())
        .bind(&new_product.name)
        .bind(&new_product.description)
        .bind(new_product.price_cents)
        .bind(new_product.quantity)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  async fn get_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
    Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
  }

  #[instrument(skip(self), err(Display))]
  async fn list_products(&self, query: &ProductQuery) -> StoreResult<Vec<Product>> {
    let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE TRUE"));
    if let Some(name) = &query.name_contains {
      qb.push(" AND name ILIKE ").push_bind(format!("%{}%", escape_like(name)));
    }
    if let Some(min) = query.min_price_cents {
      qb.push(" AND price_cents >= ").push_bind(min);
    }
    if let Some(max) = query.max_price_cents {
      qb.push(" AND price_cents <= ").push_bind(max);
    }
    if let Some(rating) = query.min_average_rating {
      qb.push(" AND average_rating >= ").push_bind(rating);
    }
    qb.push(match query.order {
      Some(PriceOrder::LowToHigh) => " ORDER BY price_cents ASC, created_at ASC",
      Some(PriceOrder::HighToLow) => " ORDER BY price_cents DESC, created_at ASC",
      None => " ORDER BY created_at ASC",
    });
    let products = qb.build_query_as::<Product>().fetch_all(&self.pool).await?;
    debug!(count = products.len(), "Listed products.");
    Ok(products)
  }

  async fn update_product(&self, id: Uuid, patch: &ProductPatch) -> StoreResult<Product> {
    let sql = format!(
      "UPDATE products SET name = COALESCE($2, name), description = COALESCE($3, description), \
       price_cents = COALESCE($4, price_cents), quantity = COALESCE($5, quantity), updated_at = NOW() \
       WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    );
    sqlx::query_as(&sql)
      .bind(id)
      .bind(&patch.name)
      .bind(&patch.description)
      .bind(patch.price_cents)
      .bind(patch.quantity)
      .fetch_optional(&self.pool)
      .await?
      .ok_or(StoreError::NotFound("Product"))
  }

  async fn set_product_picture(&self, id: Uuid, picture: String) -> StoreResult<()> {
    let result = sqlx::query("UPDATE products SET picture = $2, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .bind(picture)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Product"));
    }
    Ok(())
  }

  async fn delete_product(&self, id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Product"));
    }
    Ok(())
  }

  async fn is_purchaser(&self, product_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
    Ok(
      sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM product_purchasers WHERE product_id = $1 AND user_id = $2)")
        .bind(product_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?,
    )
  }

  #[instrument(skip(self), err(Display))]
  async fn add_rating(&self, product_id: Uuid, user_id: Uuid, rating: i16) -> StoreResult<Product> {
    let mut tx = self.pool.begin().await?;
    let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1 FOR UPDATE")
      .bind(product_id)
      .fetch_optional(&mut *tx)
      .await?;
    if exists.is_none() {
      return Err(StoreError::NotFound("Product"));
    }
    sqlx::query("INSERT INTO product_ratings (id, product_id, user_id, rating) VALUES ($1, $2, $3, $4)")
      .bind(Uuid::new_v4())
      .bind(product_id)
      .bind(user_id)
      .bind(rating)
      .execute(&mut *tx)
      .await?;
    let sql = format!(
      "UPDATE products SET \
         average_rating = (SELECT AVG(rating)::float8 FROM product_ratings WHERE product_id = $1), \
         rating_count = (SELECT COUNT(*) FROM product_ratings WHERE product_id = $1), \
         updated_at = NOW() \
       WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
    );
    let product = sqlx::query_as(&sql).bind(product_id).fetch_one(&mut *tx).await?;
    tx.commit().await?;
    Ok(product)
  }

  async fn add_review(&self, product_id: Uuid, user_id: Uuid, review: &str) -> StoreResult<Review> {
    let result = sqlx::query_as::<_, Review>(
      "INSERT INTO product_reviews (id, product_id, user_id, review) VALUES ($1, $2, $3, $4) \
       RETURNING id, product_id, user_id, review, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(product_id)
    .bind(user_id)
    .bind(review)
    .fetch_one(&self.pool)
    .await;
    match result {
      Ok(review) => Ok(review),
      Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(StoreError::NotFound("Product")),
      Err(e) => Err(e.into()),
    }
  }

  async fn list_reviews(&self, product_id: Uuid) -> StoreResult<Vec<Review>> {
    Ok(
      sqlx::query_as(
        "SELECT id, product_id, user_id, review, created_at FROM product_reviews \
         WHERE product_id = $1 ORDER BY created_at ASC",
      )
      .bind(product_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn cart_lines(&self, user_id: Uuid) -> StoreResult<Vec<CartLine>> {
    Ok(
      sqlx::query_as(
        "SELECT c.product_id, p.name, p.price_cents, p.picture, p.quantity AS available, c.quantity \
         FROM cart_items c JOIN products p ON p.id = c.product_id \
         WHERE c.user_id = $1 ORDER BY c.added_at ASC",
      )
      .bind(user_id)
      .fetch_all(&self.pool)
      .await?,
    )
  }

  async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
    positive_quantity(quantity)?;
    let result = sqlx::query_as::<_, CartItem>(
      "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
       ON CONFLICT (user_id, product_id) \
       DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW() \
       RETURNING user_id, product_id, quantity, added_at, updated_at",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_one(&self.pool)
    .await;
    match result {
      Ok(item) => Ok(item),
      Err(sqlx::Error::Database(db_err)) if db_err.is_foreign_key_violation() => Err(StoreError::NotFound("Product")),
      // numeric_value_out_of_range: the summed quantity no longer fits the column.
      Err(sqlx::Error::Database(db_err)) if db_err.code().as_deref() == Some("22003") => Err(cart_overflow()),
      Err(e) => Err(e.into()),
    }
  }

  async fn set_cart_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> StoreResult<CartItem> {
    positive_quantity(quantity)?;
    sqlx::query_as(
      "UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE user_id = $1 AND product_id = $2 \
       RETURNING user_id, product_id, quantity, added_at, updated_at",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .fetch_optional(&self.pool)
    .await?
    .ok_or(StoreError::NotFound("Cart item"))
  }

  async fn remove_from_cart(&self, user_id: Uuid, product_id: Uuid) -> StoreResult<()> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
      .bind(user_id)
      .bind(product_id)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(StoreError::NotFound("Cart item"));
    }
    Ok(())
  }

  #[instrument(skip(self, lines), fields(lines = lines.len()), err(Display))]
  async fn reserve_stock(&self, user_id: Uuid, lines: &[StockLine]) -> StoreResult<Vec<OrderItem>> {
    for line in lines {
      positive_quantity(line.quantity)?;
    }
    let mut tx = self.pool.begin().await?;

    // Lock rows in id order so concurrent checkouts cannot deadlock.
    let mut lock_order: Vec<&StockLine> = lines.iter().collect();
    lock_order.sort_by_key(|l| l.product_id);

    let mut locked: HashMap<Uuid, LockedProduct> = HashMap::with_capacity(lines.len());
    for line in lock_order {
      let product: LockedProduct =
        sqlx::query_as("SELECT id, name, price_cents, quantity FROM products WHERE id = $1 FOR UPDATE")
          .bind(line.product_id)
          .fetch_optional(&mut *tx)
          .await?
          .ok_or(StoreError::NotFound("Product"))?;
      if product.quantity < line.quantity {
        return Err(StoreError::InsufficientStock {
          product_id: product.id,
          product_name: product.name,
        });
      }
      locked.insert(product.id, product);
    }

    let mut items = Vec::with_capacity(lines.len());
    for line in lines {
      let Some(product) = locked.get(&line.product_id) else {
        return Err(StoreError::NotFound("Product"));
      };
      sqlx::query("UPDATE products SET quantity = quantity - $2, updated_at = NOW() WHERE id = $1")
        .bind(line.product_id)
        .bind(line.quantity)
        .execute(&mut *tx)
        .await?;
      sqlx::query("INSERT INTO product_purchasers (product_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(line.product_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
      items.push(OrderItem {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity: line.quantity,
        price_cents: product.price_cents,
      });
    }

    tx.commit().await?;
    Ok(items)
  }

  #[instrument(skip(self, items), err(Display))]
  async fn release_stock(&self, user_id: Uuid, items: &[OrderItem]) -> StoreResult<()> {
    let mut tx = self.pool.begin().await?;
    Self::restock(&mut tx, user_id, items, Uuid::nil()).await?;
    tx.commit().await?;
    Ok(())
  }

  #[instrument(skip(self, new_order), fields(order_id = %new_order.id), err(Display))]
  async fn create_order(&self, new_order: NewOrder) -> StoreResult<Order> {
    let total_cents = new_order.total_cents().ok_or_else(total_out_of_range)?;
    let mut tx = self.pool.begin().await?;
    let sql = format!(
      "INSERT INTO orders (id, user_id, total_cents, status, payment_method, payment_reference, order_date, delivery_date) \
       VALUES ($1, $2, $3, 'placed', $4, $5, $6, $7) RETURNING {ORDER_COLUMNS}"
    );
    let mut order: Order = sqlx::query_as(&sql)
      .bind(new_order.id)
      .bind(new_order.user_id)
      .bind(total_cents)
      .bind(new_order.payment_method)
      .bind(&new_order.payment_reference)
      .bind(new_order.order_date)
      .bind(new_order.delivery_date())
      .fetch_one(&mut *tx)
      .await?;
    for item in &new_order.items {
      sqlx::query(
        "INSERT INTO order_items (order_id, product_id, product_name, quantity, price_cents) \
         VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(order.id)
      .bind(item.product_id)
      .bind(&item.product_name)
      .bind(item.quantity)
      .bind(item.price_cents)
      .execute(&mut *tx)
      .await?;
    }
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(order.user_id)
      .execute(&mut *tx)
      .await?;
    tx.commit().await?;

    order.items = new_order.items;
    Ok(order)
  }

  async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
    let Some(order) = sqlx::query_as::<_, Order>(&sql).bind(id).fetch_optional(&self.pool).await? else {
      return Ok(None);
    };
    Ok(Self::attach_items(&self.pool, vec![order]).await?.pop())
  }

  async fn list_orders_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY order_date DESC");
    let orders = sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?;
    Self::attach_items(&self.pool, orders).await
  }

  async fn list_all_orders(&self) -> StoreResult<Vec<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_date DESC");
    let orders = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
    Self::attach_items(&self.pool, orders).await
  }

  #[instrument(skip(self), err(Display))]
  async fn cancel_order(&self, order_id: Uuid) -> StoreResult<Order> {
    let mut tx = self.pool.begin().await?;
    let sql = format!(
      "UPDATE orders SET status = 'cancelled', updated_at = NOW() \
       WHERE id = $1 AND status = 'placed' RETURNING {ORDER_COLUMNS}"
    );
    let cancelled: Option<Order> = sqlx::query_as(&sql).bind(order_id).fetch_optional(&mut *tx).await?;
    let Some(order) = cancelled else {
      let status: Option<OrderStatus> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;
      return Err(match status {
        Some(status) => already_in_status(status),
        None => StoreError::NotFound("Order"),
      });
    };

    let mut orders = Self::attach_items(&mut *tx, vec![order]).await?;
    let order = orders.pop().ok_or(StoreError::NotFound("Order"))?;
    Self::restock(&mut tx, order.user_id, &order.items, order.id).await?;
    tx.commit().await?;
    Ok(order)
  }

  async fn update_order_status(&self, order_id: Uuid, status: OrderStatus) -> StoreResult<Order> {
    let mut tx = self.pool.begin().await?;
    let current: OrderStatus = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1 FOR UPDATE")
      .bind(order_id)
      .fetch_optional(&mut *tx)
      .await?
      .ok_or(StoreError::NotFound("Order"))?;
    if !current.can_advance_to(status) {
      return Err(StoreError::InvalidTransition { from: current, to: status });
    }
    let sql = format!("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}");
    let order: Order = sqlx::query_as(&sql).bind(order_id).bind(status).fetch_one(&mut *tx).await?;
    let mut orders = Self::attach_items(&mut *tx, vec![order]).await?;
    tx.commit().await?;
    orders.pop().ok_or(StoreError::NotFound("Order"))
  }
}
