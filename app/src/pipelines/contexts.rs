// src/pipelines/contexts.rs

//! Data carried through each workflow. Handlers receive these wrapped in
//! `stepflow::ContextData`.

use crate::models::{Account, AccountRole, CartItem, Order, OrderItem, PaymentMethod, Product};
use crate::services::payment::PaymentReceipt;
use crate::services::token_service::IssuedToken;
use crate::state::AppState;
use crate::store::StockLine;
use uuid::Uuid;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub role: AccountRole,
  pub email: String,
  pub password: String,
  pub first_name: Option<String>,
  pub last_name: Option<String>,
  pub mobile: Option<String>,
  pub username: Option<String>,
  pub account: Option<Account>,
  pub welcome_email_sent: bool,
}

impl SignupCtxData {
  pub fn new(app_state: AppState, role: AccountRole, email: String, password: String) -> Self {
    Self {
      app_state,
      role,
      email,
      password,
      first_name: None,
      last_name: None,
      mobile: None,
      username: None,
      account: None,
      welcome_email_sent: false,
    }
  }
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub role: AccountRole,
  pub email: String,
  pub password: String,
  pub account: Option<Account>,
  pub access_token: Option<IssuedToken>,
  pub refresh_token: Option<IssuedToken>,
}

#[derive(Clone)]
pub struct AddToCartCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub product: Option<Product>,
  pub already_in_cart: i32,
  pub cart_item: Option<CartItem>,
}

impl AddToCartCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, product_id: Uuid, quantity: i32) -> Self {
    Self {
      app_state,
      user_id,
      product_id,
      quantity,
      product: None,
      already_in_cart: 0,
      cart_item: None,
    }
  }
}

#[derive(Clone)]
pub struct CheckoutCtxData {
  pub app_state: AppState,
  pub user_id: Uuid,
  pub payment_method: PaymentMethod,
  /// Assigned up front so the payment gateway can tag the capture.
  pub order_id: Uuid,
  pub lines: Vec<StockLine>,
  pub customer: Option<Account>,
  pub reserved: Vec<OrderItem>,
  pub payment: Option<PaymentReceipt>,
  pub order: Option<Order>,
  pub confirmation_sent: bool,
}

impl CheckoutCtxData {
  pub fn new(app_state: AppState, user_id: Uuid, payment_method: PaymentMethod) -> Self {
    Self {
      app_state,
      user_id,
      payment_method,
      order_id: Uuid::new_v4(),
      lines: Vec::new(),
      customer: None,
      reserved: Vec::new(),
      payment: None,
      order: None,
      confirmation_sent: false,
    }
  }

  pub fn reserved_total_cents(&self) -> Option<i64> {
    OrderItem::sum_cents(&self.reserved)
  }
}

#[derive(Clone)]
pub struct CancelOrderCtxData {
  pub app_state: AppState,
  /// The buyer asking to cancel. Orders of other users are reported as missing.
  pub requested_by: Uuid,
  pub order_id: Uuid,
  pub order: Option<Order>,
  pub customer: Option<Account>,
  pub refunded: bool,
  pub notice_sent: bool,
}

impl CancelOrderCtxData {
  pub fn new(app_state: AppState, requested_by: Uuid, order_id: Uuid) -> Self {
    Self {
      app_state,
      requested_by,
      order_id,
      order: None,
      customer: None,
      refunded: false,
      notice_sent: false,
    }
  }
}
