// src/web/cookies.rs

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};

pub const ACCESS_COOKIE: &str = "token";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// An http-only session cookie carrying a signed token.
pub fn token_cookie(name: &'static str, token: String, ttl_secs: i64, secure: bool) -> Cookie<'static> {
  Cookie::build(name, token)
    .path("/")
    .http_only(true)
    .secure(secure)
    .same_site(SameSite::Lax)
    .max_age(CookieDuration::seconds(ttl_secs))
    .finish()
}

/// A cookie that tells the browser to drop `name`.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
  let mut cookie = Cookie::build(name, "").path("/").http_only(true).finish();
  cookie.make_removal();
  cookie
}
