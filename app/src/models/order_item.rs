// src/models/order_item.rs

use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// One order line. The name and price are copied from the product when the
/// order is placed and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub product_name: String,
  pub quantity: i32,
  #[serde(rename = "price")]
  pub price_cents: i64,
}

impl OrderItem {
  /// `None` when the line total does not fit in an `i64`.
  pub fn line_total_cents(&self) -> Option<i64> {
    self.price_cents.checked_mul(i64::from(self.quantity))
  }

  pub fn sum_cents(items: &[OrderItem]) -> Option<i64> {
    items
      .iter()
      .try_fold(0i64, |total, item| total.checked_add(item.line_total_cents()?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn line(price_cents: i64, quantity: i32) -> OrderItem {
    OrderItem {
      product_id: Uuid::new_v4(),
      product_name: "Lamp".into(),
      quantity,
      price_cents,
    }
  }

  #[test]
  fn totals_refuse_to_overflow() {
    assert_eq!(line(1250, 2).line_total_cents(), Some(2500));
    assert_eq!(line(i64::MAX, 2).line_total_cents(), None);
    assert_eq!(OrderItem::sum_cents(&[line(1250, 2), line(499, 1)]), Some(2999));
    assert_eq!(OrderItem::sum_cents(&[line(i64::MAX, 1), line(1, 1)]), None);
    assert_eq!(OrderItem::sum_cents(&[]), Some(0));
  }
}
