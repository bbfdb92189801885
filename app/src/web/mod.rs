// src/web/mod.rs

pub mod cookies;
pub mod handlers;
pub mod routes;
pub mod session;

pub use routes::configure_app_routes;
