use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use tracing::{info, warn};

use crate::{config::Config, error::ApiError};

pub const SESSION_COOKIE: &str = "marquee_admin";
const SESSION_HOURS: i64 = 12;

/// Server-side credential check. Without a configured password nobody gets in.
pub fn credentials_match(config: &Config, username: &str, password: &str) -> bool {
    let Some(expected) = config.admin_password.as_deref() else {
        warn!("admin login attempted but ADMIN_PASSWORD is not set");
        return false;
    };
    constant_time_eq(username.trim().as_bytes(), config.admin_username.as_bytes())
        & constant_time_eq(password.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn start_session(jar: SignedCookieJar, username: &str) -> SignedCookieJar {
    info!(username = %username, "admin signed in");
    jar.add(
        Cookie::build((SESSION_COOKIE, format!("{}|{}", username, session_expiry())))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::hours(SESSION_HOURS)),
    )
}

pub fn end_session(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn session_expiry() -> i64 {
    crate::cache::now_sec() + SESSION_HOURS * 3_600
}

/// Signed admin username, if the session cookie is present and unexpired.
pub fn session_user(jar: &SignedCookieJar) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let (user, expires) = cookie.value().rsplit_once('|')?;
    let expires: i64 = expires.parse().ok()?;
    (expires > crate::cache::now_sec()).then(|| user.to_string())
}

/// Gate for `/admin/*` pages and `/api/*`.
pub async fn require_admin(
    jar: SignedCookieJar,
    request: Request,
    next: Next,
) -> Response {
    if session_user(&jar).is_some() {
        return next.run(request).await;
    }

    if request.uri().path().starts_with("/api/") {
        ApiError::unauthorized().into_response()
    } else {
        Redirect::to("/admin/login").into_response()
    }
}
