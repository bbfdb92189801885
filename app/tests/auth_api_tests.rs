// tests/auth_api_tests.rs

#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::{harness, response_cookie, PASSWORD};
use marketplace_hub::models::AccountRole;
use marketplace_hub::services::notifier::EmailTemplate;
use marketplace_hub::store::Store;
use serde_json::{json, Value};

#[actix_rt::test]
async fn register_then_login_sets_both_cookies() {
  let h = harness();
  let app = app!(h);

  let req = test::TestRequest::post()
    .uri("/api/user/register")
    .set_json(json!({
      "firstName": "Ada",
      "lastName": "Lovelace",
      "email": "  Ada@Example.com ",
      "password": PASSWORD,
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["user"]["email"], "ada@example.com");
  assert!(body["user"].get("passwordHash").is_none());
  assert_eq!(h.notifier.sent_with(EmailTemplate::Welcome).len(), 1);

  let req = test::TestRequest::post()
    .uri("/api/user/login")
    .set_json(json!({ "email": "ADA@example.com", "password": PASSWORD, "type": "user" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let access = response_cookie(&resp, "token").expect("access cookie");
  let refresh = response_cookie(&resp, "refreshToken").expect("refresh cookie");
  assert_eq!(access.http_only(), Some(true));
  assert_eq!(refresh.http_only(), Some(true));

  // Same email again is refused.
  let req = test::TestRequest::post()
    .uri("/api/user/register")
    .set_json(json!({
      "firstName": "Ada",
      "lastName": "Lovelace",
      "email": "ada@example.com",
      "password": PASSWORD,
    }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn login_rejects_bad_credentials() {
  let h = harness();
  let app = app!(h);
  h.user("shopper@example.com").await;

  let req = test::TestRequest::post()
    .uri("/api/user/login")
    .set_json(json!({ "email": "shopper@example.com", "password": "wrong-password", "type": "user" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::post()
    .uri("/api/user/login")
    .set_json(json!({ "email": "nobody@example.com", "password": PASSWORD, "type": "user" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

  // The account exists only as a user.
  let req = test::TestRequest::post()
    .uri("/api/admin/login")
    .set_json(json!({ "email": "shopper@example.com", "password": PASSWORD, "type": "admin" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::post()
    .uri("/api/user/login")
    .set_json(json!({ "email": "shopper@example.com", "type": "user" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn protected_routes_need_a_session_of_the_right_role() {
  let h = harness();
  let app = app!(h);
  let user = h.user("shopper@example.com").await;

  let req = test::TestRequest::get().uri("/api/user/cart/getCart").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Access denied. No tokens provided.");

  let req = test::TestRequest::get()
    .uri("/api/admin/viewOrders")
    .cookie(h.access_cookie(&user))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Forbidden: Insufficient role.");

  let req = test::TestRequest::get()
    .uri("/api/user/cart/getCart")
    .cookie(actix_web::cookie::Cookie::new("token", "not-a-token"))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn refresh_cookie_alone_restores_the_session() {
  let h = harness();
  let app = app!(h);
  let user = h.user("shopper@example.com").await;

  let req = test::TestRequest::get()
    .uri("/api/user/cart/getCart")
    .cookie(h.refresh_cookie(&user))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let renewed = response_cookie(&resp, "token").expect("renewed access cookie");
  assert!(!renewed.value().is_empty());

  // The renewed cookie works on its own.
  let req = test::TestRequest::get()
    .uri("/api/user/cart/getCart")
    .cookie(renewed)
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn logout_revokes_both_tokens() {
  let h = harness();
  let app = app!(h);
  let user = h.user("shopper@example.com").await;
  let access = h.access_cookie(&user);
  let refresh = h.refresh_cookie(&user);

  let req = test::TestRequest::post()
    .uri("/api/user/logout")
    .cookie(access.clone())
    .cookie(refresh.clone())
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let cleared = response_cookie(&resp, "token").expect("access removal cookie");
  assert_eq!(cleared.value(), "");

  let req = test::TestRequest::post()
    .uri("/api/user/refresh-token")
    .cookie(refresh.clone())
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Invalid or expired refresh token.");

  let req = test::TestRequest::get()
    .uri("/api/user/cart/getCart")
    .cookie(access)
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Invalid or expired token.");

  let req = test::TestRequest::post().uri("/api/user/logout").to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn refresh_endpoint_issues_a_new_access_cookie() {
  let h = harness();
  let app = app!(h);
  let user = h.user("shopper@example.com").await;

  let req = test::TestRequest::post()
    .uri("/api/user/refresh-token")
    .cookie(h.refresh_cookie(&user))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(response_cookie(&resp, "token").is_some());

  let req = test::TestRequest::post().uri("/api/user/refresh-token").to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

  // An access token is not accepted as a refresh token.
  let req = test::TestRequest::post()
    .uri("/api/user/refresh-token")
    .cookie(actix_web::cookie::Cookie::new(
      "refreshToken",
      h.access_cookie(&user).value().to_string(),
    ))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn first_admin_is_open_then_admin_only() {
  let h = harness();
  let app = app!(h);

  let req = test::TestRequest::post()
    .uri("/api/admin/addAdmin")
    .set_json(json!({ "email": "root@example.com", "password": PASSWORD, "username": "root" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["admin"]["type"], "admin");
  // Admins get no welcome email.
  assert!(h.notifier.sent_with(EmailTemplate::Welcome).is_empty());

  let req = test::TestRequest::post()
    .uri("/api/admin/addAdmin")
    .set_json(json!({ "email": "second@example.com", "password": PASSWORD, "username": "second" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

  let root = h
    .store()
    .find_account_by_email(AccountRole::Admin, "root@example.com")
    .await
    .unwrap()
    .unwrap();
  let req = test::TestRequest::post()
    .uri("/api/admin/addAdmin")
    .cookie(h.access_cookie(&root))
    .set_json(json!({ "email": "second@example.com", "password": PASSWORD, "username": "second" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
}

#[actix_rt::test]
async fn otp_reset_flow_changes_the_password() {
  let h = harness();
  let app = app!(h);
  h.user("shopper@example.com").await;

  // Resetting without a verified OTP is refused.
  let req = test::TestRequest::put()
    .uri("/api/user/changeForgotPassword")
    .set_json(json!({ "email": "shopper@example.com", "type": "user", "newPassword": "brand-new-pass" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

  let req = test::TestRequest::post()
    .uri("/api/user/requestOtp")
    .set_json(json!({ "email": "shopper@example.com", "type": "user" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
  let sent = h.notifier.sent_with(EmailTemplate::Otp);
  assert_eq!(sent.len(), 1);
  let otp = sent[0].params["otp"].as_str().unwrap().to_string();
  assert_eq!(otp.len(), 6);

  let wrong = if otp == "000000" { "111111" } else { "000000" };
  let req = test::TestRequest::post()
    .uri("/api/user/verifyOTP")
    .set_json(json!({ "email": "shopper@example.com", "type": "user", "otp": wrong }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::post()
    .uri("/api/user/verifyOTP")
    .set_json(json!({ "email": "shopper@example.com", "type": "user", "otp": otp }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let req = test::TestRequest::put()
    .uri("/api/user/changeForgotPassword")
    .set_json(json!({ "email": "shopper@example.com", "type": "user", "newPassword": "brand-new-pass" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let req = test::TestRequest::post()
    .uri("/api/user/login")
    .set_json(json!({ "email": "shopper@example.com", "password": PASSWORD, "type": "user" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

  let req = test::TestRequest::post()
    .uri("/api/user/login")
    .set_json(json!({ "email": "shopper@example.com", "password": "brand-new-pass", "type": "user" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_rt::test]
async fn change_password_checks_the_old_one() {
  let h = harness();
  let app = app!(h);
  let user = h.user("shopper@example.com").await;

  let req = test::TestRequest::put()
    .uri("/api/user/changePassword")
    .cookie(h.access_cookie(&user))
    .set_json(json!({
      "oldPassword": "not-my-password",
      "newPassword": "another-pass",
      "confirmPassword": "another-pass",
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"], "Old password is incorrect");

  let req = test::TestRequest::put()
    .uri("/api/user/changePassword")
    .cookie(h.access_cookie(&user))
    .set_json(json!({
      "oldPassword": PASSWORD,
      "newPassword": "another-pass",
      "confirmPassword": "different-pass",
    }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::put()
    .uri("/api/user/changePassword")
    .cookie(h.access_cookie(&user))
    .set_json(json!({
      "oldPassword": PASSWORD,
      "newPassword": "another-pass",
      "confirmPassword": "another-pass",
    }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

  let account = h.store().find_account(user.id).await.unwrap().unwrap();
  assert!(marketplace_hub::services::auth_service::verify_password(&account.password_hash, "another-pass").unwrap());
}
