//! Service settings read from the process environment

use axum_extra::extract::cookie::Key;
use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Shortest accepted cookie signing secret, in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Portal settings
///
/// # Environment Variables
/// - `SRV_PORT`: listen port (default: 4000)
/// - `COOKIE_SECRET`: session cookie signing secret, at least 32 bytes (required)
/// - `COOKIE_SECURE`: mark the session cookie `Secure` (default: true)
/// - `SESSION_MAX_AGE`: session cookie lifetime in seconds (default: 30 days)
/// - `STATIC_DIR`: directory served under `/static` (default: ./ui/static)
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub srv_port: u16,
    pub cookie_secret: String,
    pub cookie_secure: bool,
    pub session_max_age: u64,
    pub static_dir: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("srv_port", 4000)?
            .set_default("cookie_secure", true)?
            .set_default("session_max_age", 2_592_000_i64)?
            .set_default("static_dir", "./ui/static")?
            .add_source(Environment::default())
            .build()?
            .try_deserialize()?;

        if settings.cookie_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Message(format!(
                "COOKIE_SECRET must be at least {} bytes long",
                MIN_SECRET_LEN
            )));
        }

        Ok(settings)
    }

    /// Signing key derived from the cookie secret
    pub fn cookie_key(&self) -> Key {
        Key::derive_from(self.cookie_secret.as_bytes())
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.srv_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const SECRET: &str = "0123456789abcdef0123456789abcdef-test";

    fn clear_env() {
        for key in [
            "SRV_PORT",
            "COOKIE_SECRET",
            "COOKIE_SECURE",
            "SESSION_MAX_AGE",
            "STATIC_DIR",
        ] {
            unsafe {
                std::env::remove_var(key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_settings_defaults() {
        clear_env();
        unsafe {
            std::env::set_var("COOKIE_SECRET", SECRET);
        }

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.srv_port, 4000);
        assert_eq!(settings.cookie_secret, SECRET);
        assert!(settings.cookie_secure);
        assert_eq!(settings.session_max_age, 2_592_000);
        assert_eq!(settings.static_dir, "./ui/static");
        assert_eq!(settings.listen_addr(), "0.0.0.0:4000");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_settings_custom_values() {
        clear_env();
        unsafe {
            std::env::set_var("COOKIE_SECRET", SECRET);
            std::env::set_var("SRV_PORT", "8080");
            std::env::set_var("COOKIE_SECURE", "false");
            std::env::set_var("SESSION_MAX_AGE", "3600");
            std::env::set_var("STATIC_DIR", "/srv/static");
        }

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.srv_port, 8080);
        assert!(!settings.cookie_secure);
        assert_eq!(settings.session_max_age, 3600);
        assert_eq!(settings.static_dir, "/srv/static");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_settings_require_cookie_secret() {
        clear_env();
        assert!(Settings::from_env().is_err());

        unsafe {
            std::env::set_var("COOKIE_SECRET", "too-short");
        }
        let err = Settings::from_env().unwrap_err();
        assert!(err.to_string().contains("COOKIE_SECRET"));

        clear_env();
    }
}
