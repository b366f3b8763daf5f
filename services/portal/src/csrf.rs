//! CSRF guard applied to every route
//!
//! Each session carries a random token. State-changing requests must echo it
//! back, either in the `csrf_token` form field or in the `X-CSRF-Token`
//! header, or they are rejected before any handler runs.

use axum::{
    body::{Body, to_bytes},
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::SignedCookieJar;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use tracing::warn;

use crate::{error::AppError, session::LoadedSession, state::AppState};

/// Form field carrying the token
pub const CSRF_FIELD: &str = "csrf_token";
/// Header carrying the token
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Largest request body the guard buffers
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Fresh random token, URL-safe
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compare tokens without stopping at the first differing byte
pub fn tokens_match(expected: &str, submitted: &str) -> bool {
    expected.len() == submitted.len()
        && expected
            .bytes()
            .zip(submitted.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

fn is_safe(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

fn form_token(body: &[u8]) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(key, _)| key == CSRF_FIELD)
        .map(|(_, value)| value.into_owned())
}

/// Resolve the session, check the token of unsafe requests and hand the
/// session to the handlers through the request extensions
pub async fn csrf_guard(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let jar = SignedCookieJar::from_headers(req.headers(), state.cookie_key.clone());
    let loaded = LoadedSession::load(&jar, &state.session);

    let mut req = if is_safe(req.method()) {
        req
    } else {
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| AppError::Csrf)?;

        let submitted = parts
            .headers
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| form_token(&bytes));

        let accepted = loaded.from_cookie
            && submitted
                .as_deref()
                .is_some_and(|token| tokens_match(&loaded.data.csrf_token, token));

        if !accepted {
            warn!("Rejected {} {}: invalid CSRF token", parts.method, parts.uri.path());
            return Err(AppError::Csrf);
        }

        Request::from_parts(parts, Body::from(bytes))
    };

    req.extensions_mut().insert(loaded);
    Ok(next.run(req).await)
}
