//! Identity provider credentials and tuning.

use std::time::Duration;

use mockable::Env;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::{DEFAULT_TOLERANCE, InvalidSigningSecret, WebhookSigningSecret};

pub const SECRET_KEY_ENV: &str = "CLERK_SECRET_KEY";
pub const WEBHOOK_SECRET_ENV: &str = "CLERK_WEBHOOK_SIGNING_SECRET";
pub const JWT_KEY_ENV: &str = "CLERK_JWT_KEY";
pub const API_URL_ENV: &str = "CLERK_API_URL";
pub const WEBHOOK_TOLERANCE_ENV: &str = "CLERK_WEBHOOK_TOLERANCE_SECS";
pub const HTTP_TIMEOUT_ENV: &str = "CLERK_HTTP_TIMEOUT_SECS";

const DEFAULT_API_URL: &str = "https://api.clerk.com/v1/";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const SECONDS_EXPECTED: &str = "a positive whole number of seconds";

/// Errors raised while reading identity provider settings.
///
/// Secret values are never echoed back.
#[derive(Debug, thiserror::Error)]
pub enum IdentityConfigError {
    #[error("missing required environment variable: {name}")]
    MissingEnv { name: &'static str },
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("CLERK_WEBHOOK_SIGNING_SECRET is not a usable signing secret: {source}")]
    WebhookSecret {
        #[source]
        source: InvalidSigningSecret,
    },
    #[error("CLERK_JWT_KEY is not an RSA public key in PEM form: {reason}")]
    JwtKey { reason: String },
}

/// Everything needed to talk to, and accept calls from, the identity
/// provider.
pub struct IdentitySettings {
    pub secret_key: Zeroizing<String>,
    pub webhook_secret: WebhookSigningSecret,
    pub jwt_public_key_pem: Zeroizing<String>,
    pub api_url: Url,
    pub webhook_tolerance: Duration,
    pub http_timeout: Duration,
}

impl IdentitySettings {
    /// Read and validate the `CLERK_*` variables.
    ///
    /// # Examples
    ///
    /// ```
    /// use echo_backend::config::{IdentityConfigError, IdentitySettings};
    /// use mockable::MockEnv;
    ///
    /// let mut env = MockEnv::new();
    /// env.expect_string().returning(|_| None);
    ///
    /// let error = IdentitySettings::from_env(&env).err().expect("nothing configured");
    /// assert!(matches!(error, IdentityConfigError::MissingEnv { name: "CLERK_SECRET_KEY" }));
    /// ```
    pub fn from_env<E: Env>(env: &E) -> Result<Self, IdentityConfigError> {
        let secret_key = required_secret(env, SECRET_KEY_ENV)?;
        let webhook_secret = {
            let encoded = required_secret(env, WEBHOOK_SECRET_ENV)?;
            WebhookSigningSecret::from_encoded(encoded.trim())
                .map_err(|source| IdentityConfigError::WebhookSecret { source })?
        };
        let jwt_public_key_pem = required_secret(env, JWT_KEY_ENV)?;
        jsonwebtoken::DecodingKey::from_rsa_pem(jwt_public_key_pem.as_bytes()).map_err(|err| {
            IdentityConfigError::JwtKey {
                reason: err.to_string(),
            }
        })?;

        Ok(Self {
            secret_key,
            webhook_secret,
            jwt_public_key_pem,
            api_url: api_url_from_env(env)?,
            webhook_tolerance: seconds_from_env(env, WEBHOOK_TOLERANCE_ENV, DEFAULT_TOLERANCE)?,
            http_timeout: seconds_from_env(env, HTTP_TIMEOUT_ENV, DEFAULT_HTTP_TIMEOUT)?,
        })
    }
}

fn required_secret<E: Env>(
    env: &E,
    name: &'static str,
) -> Result<Zeroizing<String>, IdentityConfigError> {
    let value = Zeroizing::new(env.string(name).unwrap_or_default());
    if value.trim().is_empty() {
        return Err(IdentityConfigError::MissingEnv { name });
    }
    Ok(value)
}

fn api_url_from_env<E: Env>(env: &E) -> Result<Url, IdentityConfigError> {
    let Some(raw) = env.string(API_URL_ENV) else {
        return Url::parse(DEFAULT_API_URL).map_err(|_| IdentityConfigError::InvalidEnv {
            name: API_URL_ENV,
            value: DEFAULT_API_URL.to_owned(),
            expected: "an absolute http(s) url",
        });
    };
    let invalid = || IdentityConfigError::InvalidEnv {
        name: API_URL_ENV,
        value: raw.clone(),
        expected: "an absolute http(s) url",
    };
    let mut url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid());
    }
    // Relative joins need the trailing slash on the version segment.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn seconds_from_env<E: Env>(
    env: &E,
    name: &'static str,
    default: Duration,
) -> Result<Duration, IdentityConfigError> {
    let Some(raw) = env.string(name) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(IdentityConfigError::InvalidEnv {
            name,
            value: raw,
            expected: SECONDS_EXPECTED,
        }),
    }
}
