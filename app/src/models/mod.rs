// src/models/mod.rs

//! Data structures representing stored entities.

pub mod account;
pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod product;
pub mod revoked_token;

pub use account::{Account, AccountRole, NewAccount};
pub use cart_item::{CartItem, CartLine};
pub use order::{NewOrder, Order, OrderStatus, PaymentMethod};
pub use order_item::OrderItem;
pub use product::{
  NewProduct, PriceOrder, Product, ProductDetail, ProductPatch, ProductQuery, Review, MAX_PRICE_CENTS,
};
pub use revoked_token::RevokedToken;
