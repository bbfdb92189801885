// src/models/order.rs

use super::OrderItem;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

/// Days between placing an order and its expected delivery.
pub const DELIVERY_LEAD_DAYS: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
pub enum OrderStatus {
  Placed,
  Shipped,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// Forward moves an admin may make. Cancellation goes through the
  /// cancel workflow and is not reachable from here.
  pub fn can_advance_to(self, next: OrderStatus) -> bool {
    matches!(
      (self, next),
      (OrderStatus::Placed, OrderStatus::Shipped) | (OrderStatus::Shipped, OrderStatus::Delivered)
    )
  }

  pub fn is_cancellable(self) -> bool {
    self == OrderStatus::Placed
  }
}

impl std::fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      OrderStatus::Placed => "Placed",
      OrderStatus::Shipped => "Shipped",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method_enum", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Card,
  Cash,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  #[sqlx(skip)]
  pub items: Vec<OrderItem>,
  #[serde(rename = "totalPrice")]
  pub total_cents: i64,
  pub status: OrderStatus,
  pub payment_method: PaymentMethod,
  pub payment_reference: Option<String>,
  pub order_date: DateTime<Utc>,
  pub delivery_date: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
  pub id: Uuid,
  pub user_id: Uuid,
  pub items: Vec<OrderItem>,
  pub payment_method: PaymentMethod,
  pub payment_reference: Option<String>,
  pub order_date: DateTime<Utc>,
}

impl NewOrder {
  /// `None` when the total does not fit in an `i64`.
  pub fn total_cents(&self) -> Option<i64> {
    OrderItem::sum_cents(&self.items)
  }

  pub fn delivery_date(&self) -> DateTime<Utc> {
    self.order_date + Duration::days(DELIVERY_LEAD_DAYS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_only_moves_forward() {
    assert!(OrderStatus::Placed.can_advance_to(OrderStatus::Shipped));
    assert!(OrderStatus::Shipped.can_advance_to(OrderStatus::Delivered));
    assert!(!OrderStatus::Placed.can_advance_to(OrderStatus::Delivered));
    assert!(!OrderStatus::Delivered.can_advance_to(OrderStatus::Shipped));
    assert!(!OrderStatus::Placed.can_advance_to(OrderStatus::Cancelled));
    assert!(!OrderStatus::Cancelled.can_advance_to(OrderStatus::Placed));
  }

  #[test]
  fn only_placed_orders_are_cancellable() {
    assert!(OrderStatus::Placed.is_cancellable());
    for status in [OrderStatus::Shipped, OrderStatus::Delivered, OrderStatus::Cancelled] {
      assert!(!status.is_cancellable());
    }
  }

  #[test]
  fn totals_and_delivery_date_derive_from_lines() {
    let order_date = Utc::now();
    let new_order = NewOrder {
      id: Uuid::new_v4(),
      user_id: Uuid::new_v4(),
      items: vec![
        OrderItem {
          product_id: Uuid::new_v4(),
          product_name: "Mug".into(),
          quantity: 2,
          price_cents: 1250,
        },
        OrderItem {
          product_id: Uuid::new_v4(),
          product_name: "Tea".into(),
          quantity: 1,
          price_cents: 499,
        },
      ],
      payment_method: PaymentMethod::Cash,
      payment_reference: None,
      order_date,
    };
    assert_eq!(new_order.total_cents(), Some(2999));
    assert_eq!(new_order.delivery_date() - order_date, Duration::days(5));
  }
}
