//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `MART_JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `MART_HOST` - Bind address (default: 127.0.0.1)
//! - `MART_PORT` - Listen port (default: 8000)
//! - `MART_ACCESS_TOKEN_TTL_MINUTES` - Access token lifetime (default: 30)
//! - `MART_REFRESH_TOKEN_TTL_HOURS` - Refresh token lifetime (default: 24)
//! - `MART_ADMIN_SIGNUP_KEY` - Enables `/api/admin/register/` when set
//! - `MART_CORS_ORIGINS` - Comma-separated list of allowed browser origins
//! - `MART_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET` -
//!   Media service credentials; image uploads are disabled unless all three are set
//! - `CLOUDINARY_UPLOAD_FOLDER` - Folder for uploaded product images (default: products)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// Shared key required to self-register an admin account
    pub admin_signup_key: Option<SecretString>,
    /// Media service credentials for product images
    pub media: Option<MediaConfig>,
    /// Browser origins allowed by CORS (empty disables the CORS layer)
    pub cors_origins: Vec<String>,
    /// Emit logs as JSON
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Token signing configuration.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC secret used to sign access and refresh tokens
    pub secret: SecretString,
    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,
    /// Refresh token lifetime in hours
    pub refresh_ttl_hours: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"[REDACTED]")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_hours", &self.refresh_ttl_hours)
            .finish()
    }
}

/// Cloudinary-compatible media service configuration.
///
/// Implements `Debug` manually to redact the API secret.
#[derive(Clone)]
pub struct MediaConfig {
    /// Cloud name (account identifier in upload URLs)
    pub cloud_name: String,
    /// Public API key
    pub api_key: String,
    /// API secret used to sign requests
    pub api_secret: SecretString,
    /// Folder uploaded images are stored under
    pub upload_folder: String,
}

impl std::fmt::Debug for MediaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("upload_folder", &self.upload_folder)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("MART_DATABASE_URL")?;
        let host = parse_env("MART_HOST", "127.0.0.1")?;
        let port = parse_env("MART_PORT", "8000")?;

        let jwt = JwtConfig::from_env()?;
        let admin_signup_key = match get_optional_env("MART_ADMIN_SIGNUP_KEY") {
            Some(key) => {
                validate_secret_strength(&key, "MART_ADMIN_SIGNUP_KEY")?;
                Some(SecretString::from(key))
            }
            None => None,
        };
        let media = MediaConfig::from_env()?;

        let cors_origins = get_optional_env("MART_CORS_ORIGINS")
            .map(|origins| parse_origins(&origins))
            .transpose()?
            .unwrap_or_default();
        let log_json = get_optional_env("MART_LOG_JSON")
            .is_some_and(|v| matches!(v.as_str(), "1" | "true" | "TRUE"));

        Ok(Self {
            database_url,
            host,
            port,
            jwt,
            admin_signup_key,
            media,
            cors_origins,
            log_json,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secret = get_validated_secret("MART_JWT_SECRET")?;
        validate_secret_length(&secret, "MART_JWT_SECRET")?;

        let access_ttl_minutes: i64 = parse_env("MART_ACCESS_TOKEN_TTL_MINUTES", "30")?;
        let refresh_ttl_hours: i64 = parse_env("MART_REFRESH_TOKEN_TTL_HOURS", "24")?;
        if access_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MART_ACCESS_TOKEN_TTL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }
        if refresh_ttl_hours <= 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MART_REFRESH_TOKEN_TTL_HOURS".to_string(),
                "must be positive".to_string(),
            ));
        }

        Ok(Self {
            secret,
            access_ttl_minutes,
            refresh_ttl_hours,
        })
    }
}

impl MediaConfig {
    /// Media credentials are all-or-nothing.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cloud_name = get_optional_env("CLOUDINARY_CLOUD_NAME");
        let api_key = get_optional_env("CLOUDINARY_API_KEY");
        let api_secret = get_optional_env("CLOUDINARY_API_SECRET");

        match (cloud_name, api_key, api_secret) {
            (None, None, None) => Ok(None),
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Ok(Some(Self {
                cloud_name,
                api_key,
                api_secret: SecretString::from(api_secret),
                upload_folder: get_env_or_default("CLOUDINARY_UPLOAD_FOLDER", "products"),
            })),
            (cloud_name, api_key, _) => {
                let missing = if cloud_name.is_none() {
                    "CLOUDINARY_CLOUD_NAME"
                } else if api_key.is_none() {
                    "CLOUDINARY_API_KEY"
                } else {
                    "CLOUDINARY_API_SECRET"
                };
                Err(ConfigError::MissingEnvVar(missing.to_string()))
            }
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated origin list into serialized `scheme://host[:port]` origins.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(|o| {
            let invalid = |reason: &str| {
                ConfigError::InvalidEnvVar(
                    "MART_CORS_ORIGINS".to_string(),
                    format!("{o}: {reason}"),
                )
            };
            let url = url::Url::parse(o).map_err(|e| invalid(&e.to_string()))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid("scheme must be http or https"));
            }
            Ok(url.origin().ascii_serialization())
        })
        .collect()
}

/// Validate that a signing secret meets minimum length requirements.
fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
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

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("q8#Lm2!vR7^tW4&k") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        let err = validate_secret_strength("your-jwt-signing-key", "MART_JWT_SECRET").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        assert!(validate_secret_strength("changeme-now-42", "MART_JWT_SECRET").is_err());
    }

    #[test]
    fn test_validate_secret_strength_rejects_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "MART_JWT_SECRET");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_accepts_random_key() {
        assert!(validate_secret_strength("q8#Lm2!vR7^tW4&kZ1@pN6*yB3$cD9%h", "MART_JWT_SECRET").is_ok());
    }

    #[test]
    fn test_validate_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "MART_JWT_SECRET").is_err());
        assert!(validate_secret_length(&SecretString::from("k".repeat(32)), "MART_JWT_SECRET").is_ok());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://mart.africa/, http://localhost:5173 ,,").unwrap(),
            vec!["https://mart.africa", "http://localhost:5173"]
        );
        assert!(parse_origins("mart.africa").is_err());
        assert!(parse_origins("ftp://mart.africa").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let jwt = JwtConfig {
            secret: SecretString::from("super_secret_signing_key"),
            access_ttl_minutes: 30,
            refresh_ttl_hours: 24,
        };
        let media = MediaConfig {
            cloud_name: "mart-africa".to_string(),
            api_key: "123456".to_string(),
            api_secret: SecretString::from("super_secret_media_key"),
            upload_folder: "products".to_string(),
        };

        let output = format!("{jwt:?} {media:?}");
        assert!(output.contains("mart-africa"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("super_secret_signing_key"));
        assert!(!output.contains("super_secret_media_key"));
    }

    #[test]
    fn test_socket_addr() {
        let config = ApiConfig {
            database_url: SecretString::from("postgres://localhost/mart"),
            host: "0.0.0.0".parse().unwrap(),
            port: 8000,
            jwt: JwtConfig {
                secret: SecretString::from("k".repeat(32)),
                access_ttl_minutes: 30,
                refresh_ttl_hours: 24,
            },
            admin_signup_key: None,
            media: None,
            cors_origins: Vec::new(),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "0.0.0.0");
        assert_eq!(addr.port(), 8000);
    }
}
