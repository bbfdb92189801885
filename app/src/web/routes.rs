// src/web/routes.rs

use actix_web::middleware::from_fn;
use actix_web::{web, HttpResponse};

use crate::errors::AppError;
use crate::web::handlers::{
  admin_handlers, auth_handlers, cart_handlers, order_handlers, product_handlers, review_handlers,
};
use crate::web::session::attach_refreshed_cookie;

async fn home_handler() -> HttpResponse {
  HttpResponse::Ok().body("You have everything installed!")
}

/// Body, query and path extraction failures answer like every other
/// validation error.
fn json_config() -> web::JsonConfig {
  web::JsonConfig::default()
    .limit(64 * 1024)
    .error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
  web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
  web::PathConfig::default().error_handler(|_err, _req| AppError::Validation("Invalid ID format".to_string()).into())
}

/// Routes shared verbatim by the user and admin scopes.
fn account_routes(scope: actix_web::Scope) -> actix_web::Scope {
  scope
    .route("/login", web::post().to(auth_handlers::login_handler))
    .route("/refresh-token", web::post().to(auth_handlers::refresh_token_handler))
    .route("/logout", web::post().to(auth_handlers::logout_handler))
    .route("/requestOtp", web::post().to(auth_handlers::request_otp_handler))
    .route("/verifyOTP", web::post().to(auth_handlers::verify_otp_handler))
    .route("/changePassword", web::put().to(auth_handlers::change_password_handler))
    .route(
      "/changeForgotPassword",
      web::put().to(auth_handlers::change_forgot_password_handler),
    )
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(json_config())
    .app_data(query_config())
    .app_data(path_config())
    .route("/home", web::get().to(home_handler))
    .service(
      account_routes(web::scope("/api/user"))
        .route("/register", web::post().to(auth_handlers::register_handler))
        // Catalog
        .route("/viewProducts", web::get().to(product_handlers::view_products_handler))
        .route("/products/{id}", web::get().to(product_handlers::get_product_handler))
        .route("/searchProducts", web::get().to(product_handlers::search_products_handler))
        .route("/filterProducts", web::get().to(product_handlers::filter_products_handler))
        .route("/sortProducts", web::get().to(product_handlers::sort_products_handler))
        // Cart
        .service(
          web::scope("/cart")
            .route("/addProduct", web::post().to(cart_handlers::add_product_handler))
            .route("/removeProduct", web::post().to(cart_handlers::remove_product_handler))
            .route("/changeQuantity", web::post().to(cart_handlers::change_quantity_handler))
            .route("/getCart", web::get().to(cart_handlers::get_cart_handler))
            .route("/checkoutCart", web::post().to(order_handlers::checkout_cart_handler)),
        )
        // Orders and feedback
        .route("/orders", web::get().to(order_handlers::list_orders_handler))
        .route("/cancelOrder", web::post().to(order_handlers::cancel_order_handler))
        .route("/rateProduct", web::post().to(review_handlers::rate_product_handler))
        .route("/reviewProduct", web::post().to(review_handlers::review_product_handler))
        .wrap(from_fn(attach_refreshed_cookie)),
    )
    .service(
      account_routes(web::scope("/api/admin"))
        .route("/addAdmin", web::post().to(auth_handlers::add_admin_handler))
        .route("/addProduct", web::post().to(admin_handlers::add_product_handler))
        .route("/uploadPicture", web::post().to(admin_handlers::upload_picture_handler))
        .route("/editProduct", web::put().to(admin_handlers::edit_product_handler))
        .route("/deleteProduct/{id}", web::delete().to(admin_handlers::delete_product_handler))
        .route("/viewProducts", web::get().to(admin_handlers::view_products_handler))
        .route("/viewOrders", web::get().to(admin_handlers::view_orders_handler))
        .route(
          "/updateOrderStatus",
          web::put().to(admin_handlers::update_order_status_handler),
        )
        .wrap(from_fn(attach_refreshed_cookie)),
    );
}
