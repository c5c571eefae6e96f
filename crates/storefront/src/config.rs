//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `STOREFRONT_SESSION_SECRET` - Session secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate, 0.0 to 1.0 (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate, 0.0 to 1.0 (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Session secret
    pub session_secret: SecretString,
    /// Error tracking
    pub sentry: SentryConfig,
}

/// Sentry client settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("database_url", &"[REDACTED]")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("session_secret", &"[REDACTED]")
            .field("sentry", &self.sentry)
            .finish()
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Same as [`StorefrontConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database_url = env
            .get("STOREFRONT_DATABASE_URL")
            .or_else(|| env.get("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_owned()))?;
        let host = env.parse_or("STOREFRONT_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parse_or("STOREFRONT_PORT", 3000_u16)?;
        let base_url = env.required("STOREFRONT_BASE_URL")?;

        let session_secret = env.required("STOREFRONT_SESSION_SECRET")?;
        validate_secret_strength(&session_secret, "STOREFRONT_SESSION_SECRET")?;
        let session_secret = SecretString::from(session_secret);
        validate_session_secret(&session_secret, "STOREFRONT_SESSION_SECRET")?;

        let defaults = SentryConfig::default();
        let sentry = SentryConfig {
            dsn: env.get("SENTRY_DSN"),
            environment: env.get("SENTRY_ENVIRONMENT"),
            sample_rate: env.rate_or("SENTRY_SAMPLE_RATE", defaults.sample_rate)?,
            traces_sample_rate: env
                .rate_or("SENTRY_TRACES_SAMPLE_RATE", defaults.traces_sample_rate)?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should carry the `Secure` flag.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Value of `key`, with empty values treated as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_owned()))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key).map_or(Ok(default), |value| {
            value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string()))
        })
    }

    /// A sample rate in `0.0..=1.0`.
    fn rate_or(&self, key: &str, default: f32) -> Result<f32, ConfigError> {
        let rate: f32 = self.parse_or(key, default)?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_owned(),
                "must be between 0.0 and 1.0".to_owned(),
            ))
        }
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = secret.expose_secret().chars().count();
    if len < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!("must be at least {MIN_SESSION_SECRET_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // secrets are far shorter than 2^52 chars
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const GOOD_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6%";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/comptoir"),
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("STOREFRONT_SESSION_SECRET", GOOD_SECRET),
        ]
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(&minimal())).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(!config.secure_cookies());
        assert_eq!(config.sentry, SentryConfig::default());
    }

    #[test]
    fn test_database_url_falls_back() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "STOREFRONT_DATABASE_URL");
        vars.push(("DATABASE_URL", "postgres://fallback/db"));

        let config = StorefrontConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.database_url.expose_secret(), "postgres://fallback/db");
    }

    #[test]
    fn test_missing_required_var() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "STOREFRONT_BASE_URL");

        let err = StorefrontConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "STOREFRONT_BASE_URL"));
    }

    #[test]
    fn test_invalid_port_and_rate() {
        let mut vars = minimal();
        vars.push(("STOREFRONT_PORT", "eighty"));
        let err = StorefrontConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "STOREFRONT_PORT"));

        let mut vars = minimal();
        vars.push(("SENTRY_SAMPLE_RATE", "1.5"));
        let err = StorefrontConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "SENTRY_SAMPLE_RATE"));
    }

    #[test]
    fn test_https_base_url_enables_secure_cookies() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "STOREFRONT_BASE_URL");
        vars.push(("STOREFRONT_BASE_URL", "https://shop.example.org"));

        let config = StorefrontConfig::from_lookup(lookup(&vars)).unwrap();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_placeholder_and_low_entropy_secrets_rejected() {
        for bad in [
            "your-session-key-here",
            "changeme123",
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
        ] {
            let err = validate_secret_strength(bad, "TEST_VAR").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        }
        assert!(validate_secret_strength(GOOD_SECRET, "TEST_VAR").is_ok());
    }

    #[test]
    fn test_short_session_secret_rejected() {
        let mut vars = minimal();
        vars.retain(|(k, _)| *k != "STOREFRONT_SESSION_SECRET");
        vars.push(("STOREFRONT_SESSION_SECRET", "aB3$xY9!mK2@nL5#"));

        let err = StorefrontConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = StorefrontConfig::from_lookup(lookup(&minimal())).unwrap();
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("http://localhost:3000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains(GOOD_SECRET));
        assert!(!debug_output.contains("postgres://"));
    }
}
