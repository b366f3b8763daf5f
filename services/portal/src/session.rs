//! Signed-cookie sessions carrying the signed-in user, the CSRF token and
//! a queue of flash messages
//!
//! The whole payload lives in one signed cookie. A handler receives a
//! [`Session`], mutates it, and hands the cookie back with [`Session::save`].
//! The payload records when it was last saved, so a session idle for longer
//! than the configured lifetime starts over as a new one.
//!
//! Every response carries the cookie so the CSRF token survives, but a
//! session only stops being new once it signs in, signs out or queues a
//! flash message.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::SignedCookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tracing::error;

use crate::{csrf, models::UserId, state::AppState};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "portal_session";

/// Cookie attributes and lifetime of sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secure: bool,
    pub max_age: Duration,
}

/// Payload stored in the session cookie
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flashes: Vec<String>,
    /// Set by sign-in, sign-out and flash writes
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub established: bool,
    /// Unix timestamp of the last save
    #[serde(default)]
    pub issued: i64,
}

impl SessionData {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
    }

    /// Decode a cookie value, discarding payloads older than `max_age`
    pub fn decode(value: &str, max_age: Duration) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(value).ok()?;
        let data: Self = serde_json::from_slice(&bytes).ok()?;

        let age = Utc::now().timestamp().saturating_sub(data.issued);
        let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
        (0..=max_age).contains(&age).then_some(data)
    }
}

/// Session state resolved from the request cookie
#[derive(Debug, Clone)]
pub struct LoadedSession {
    pub data: SessionData,
    /// A valid session cookie came with the request
    pub from_cookie: bool,
}

impl LoadedSession {
    pub fn load(jar: &SignedCookieJar, config: &SessionConfig) -> Self {
        let existing = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| SessionData::decode(cookie.value(), config.max_age));

        let (mut data, from_cookie) = match existing {
            Some(data) => (data, true),
            None => (SessionData::default(), false),
        };
        if data.csrf_token.is_empty() {
            data.csrf_token = csrf::generate_token();
        }

        Self { data, from_cookie }
    }
}

/// The session of the current request
pub struct Session {
    jar: SignedCookieJar,
    data: SessionData,
    secure: bool,
    max_age: Duration,
}

impl Session {
    pub fn new(jar: SignedCookieJar, loaded: LoadedSession, config: &SessionConfig) -> Self {
        Self {
            jar,
            data: loaded.data,
            secure: config.secure,
            max_age: config.max_age,
        }
    }

    /// Nothing has been recorded in this session yet
    pub fn is_new(&self) -> bool {
        !self.data.established
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.data.user_id
    }

    pub fn csrf_token(&self) -> &str {
        &self.data.csrf_token
    }

    /// Start an authenticated session for `user_id` with a fresh CSRF token
    pub fn sign_in(&mut self, user_id: UserId) {
        self.data.user_id = Some(user_id);
        self.data.csrf_token = csrf::generate_token();
        self.data.established = true;
    }

    /// Forget the signed-in user. The session and its CSRF token stay.
    pub fn sign_out(&mut self) {
        self.data.user_id = None;
        self.data.established = true;
    }

    pub fn add_flash(&mut self, message: impl Into<String>) {
        self.data.flashes.push(message.into());
        self.data.established = true;
    }

    /// First queued flash message, left in the queue
    pub fn peek_flash(&self) -> Option<&str> {
        self.data.flashes.first().map(String::as_str)
    }

    /// Drain the flash queue, returning its first message
    pub fn take_flash(&mut self) -> Option<String> {
        self.data.flashes.drain(..).next()
    }

    /// Write the session back into its cookie
    pub fn save(mut self) -> SignedCookieJar {
        self.data.issued = Utc::now().timestamp();
        let max_age = i64::try_from(self.max_age.as_secs()).unwrap_or(i64::MAX);

        match self.data.encode() {
            Ok(value) => self.jar.add(
                Cookie::build((SESSION_COOKIE, value))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Strict)
                    .secure(self.secure)
                    .max_age(time::Duration::seconds(max_age)),
            ),
            Err(e) => {
                error!("Failed to encode session: {}", e);
                self.jar
            }
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = SignedCookieJar::from_headers(&parts.headers, state.cookie_key.clone());

        // The CSRF guard has usually resolved the session already.
        let loaded = match parts.extensions.get::<LoadedSession>() {
            Some(loaded) => loaded.clone(),
            None => LoadedSession::load(&jar, &state.session),
        };

        Ok(Session::new(jar, loaded, &state.session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::response::IntoResponse;
    use axum_extra::extract::cookie::Key;

    fn config() -> SessionConfig {
        SessionConfig {
            secure: false,
            max_age: Duration::from_secs(3600),
        }
    }

    fn key() -> Key {
        Key::from(&[7u8; 64][..])
    }

    fn fresh_session() -> Session {
        let jar = SignedCookieJar::new(key());
        let loaded = LoadedSession::load(&jar, &config());
        Session::new(jar, loaded, &config())
    }

    /// Carry the Set-Cookie of a saved session over to a new request
    fn reload(jar: SignedCookieJar) -> LoadedSession {
        let response = (jar, ()).into_response();
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, pair.parse().unwrap());
        LoadedSession::load(&SignedCookieJar::from_headers(&headers, key()), &config())
    }

    #[test]
    fn test_new_session_has_token() {
        let session = fresh_session();
        assert!(session.is_new());
        assert_eq!(session.user_id(), None);
        assert_eq!(session.peek_flash(), None);
        assert!(!session.csrf_token().is_empty());
    }

    #[test]
    fn test_saved_session_round_trips_through_cookie() {
        let mut session = fresh_session();
        session.sign_in(42);
        session.add_flash("Logged in successfully.");
        let token = session.csrf_token().to_string();

        let loaded = reload(session.save());
        assert!(loaded.from_cookie);
        assert!(loaded.data.established);
        assert_eq!(loaded.data.user_id, Some(42));
        assert_eq!(loaded.data.csrf_token, token);
        assert_eq!(loaded.data.flashes, ["Logged in successfully."]);
    }

    #[test]
    fn test_sign_in_rotates_token_and_sign_out_keeps_it() {
        let mut session = fresh_session();
        let before = session.csrf_token().to_string();

        session.sign_in(1);
        let after = session.csrf_token().to_string();
        assert_ne!(before, after);

        session.sign_out();
        assert_eq!(session.user_id(), None);
        assert_eq!(session.csrf_token(), after);
    }

    #[test]
    fn test_untouched_session_stays_new_across_saves() {
        let session = fresh_session();
        let token = session.csrf_token().to_string();

        let loaded = reload(session.save());
        assert!(loaded.from_cookie);
        assert_eq!(loaded.data.csrf_token, token);

        let session = Session::new(SignedCookieJar::new(key()), loaded, &config());
        assert!(session.is_new());
    }

    #[test]
    fn test_sign_out_and_flash_establish_session() {
        let mut session = fresh_session();
        session.sign_out();
        assert!(!session.is_new());

        let mut session = fresh_session();
        session.add_flash("hello");
        assert!(!session.is_new());
    }

    #[test]
    fn test_cookie_attributes() {
        let response = (fresh_session().save(), ()).into_response();
        let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();

        assert!(set_cookie.starts_with("portal_session="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Strict"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Max-Age=3600"));
        assert!(!set_cookie.contains("Secure"));
    }

    #[test]
    fn test_take_flash_drains_queue() {
        let mut session = fresh_session();
        session.add_flash("first");
        session.add_flash("second");

        assert_eq!(session.peek_flash(), Some("first"));
        assert_eq!(session.take_flash().as_deref(), Some("first"));
        assert_eq!(session.take_flash(), None);
    }

    #[test]
    fn test_tampered_cookie_starts_new_session() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "portal_session=forged".parse().unwrap());

        let loaded = LoadedSession::load(&SignedCookieJar::from_headers(&headers, key()), &config());
        assert!(!loaded.from_cookie);
        assert_eq!(loaded.data.user_id, None);
    }

    #[test]
    fn test_expired_payload_is_rejected() {
        let data = SessionData {
            user_id: Some(3),
            csrf_token: "token".to_string(),
            flashes: Vec::new(),
            established: true,
            issued: Utc::now().timestamp() - 7200,
        };
        let encoded = data.encode().unwrap();

        assert_eq!(SessionData::decode(&encoded, Duration::from_secs(3600)), None);
        assert_eq!(
            SessionData::decode(&encoded, Duration::from_secs(10_800)),
            Some(data)
        );
    }
}
