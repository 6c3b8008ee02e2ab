//! Bearer token authentication.
//!
//! Identity provider session tokens are JWTs. A verified token yields a
//! [`Principal`]: `sub` is the external id, `echo_id` the linked local id and
//! `onboarded` the onboarding claim. Handlers take `Principal` as an
//! extractor argument; the verifier is looked up from app data.
//!
//! Every route other than onboarding takes [`OnboardedPrincipal`] instead,
//! which answers 403 until the token carries `onboarded: true` and a
//! well-formed `echo_id`.

use actix_web::http::header::{AUTHORIZATION, HeaderMap};
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{Ready, ready};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::{Error, ExternalId, OnboardedPrincipal, OnboardingRequired, Principal, UserId};

/// Accepted clock skew when checking `exp` and `nbf`, in seconds.
const LEEWAY_SECS: u64 = 30;

/// Why a bearer token was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenRejected {
    #[error("authorization header is missing")]
    Missing,
    #[error("authorization header is not a bearer token")]
    NotBearer,
    #[error("token failed verification: {message}")]
    Invalid { message: String },
}

impl From<TokenRejected> for Error {
    fn from(rejection: TokenRejected) -> Self {
        match rejection {
            TokenRejected::Missing => Error::unauthorized("authentication required"),
            TokenRejected::NotBearer | TokenRejected::Invalid { .. } => {
                Error::unauthorized("invalid bearer token")
            }
        }
    }
}

impl From<OnboardingRequired> for Error {
    fn from(reason: OnboardingRequired) -> Self {
        Error::forbidden(reason.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    echo_id: Option<String>,
    #[serde(default)]
    onboarded: bool,
}

/// Verifies identity provider session tokens.
pub struct BearerTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl BearerTokenVerifier {
    fn with_key(decoding_key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = LEEWAY_SECS;
        Self {
            decoding_key,
            validation,
        }
    }

    /// RS256 verifier for the identity provider's PEM public key.
    pub fn rs256(public_key_pem: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?;
        Ok(Self::with_key(key, Algorithm::RS256))
    }

    /// HS256 verifier for a shared secret.
    pub fn hs256(secret: &[u8]) -> Self {
        Self::with_key(DecodingKey::from_secret(secret), Algorithm::HS256)
    }

    /// Verify a raw token and build the principal it asserts.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenRejected> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation).map_err(
            |err| TokenRejected::Invalid {
                message: err.to_string(),
            },
        )?;
        let claims = data.claims;
        let external_id = ExternalId::new(claims.sub).map_err(|err| TokenRejected::Invalid {
            message: format!("invalid subject: {err}"),
        })?;
        let local_id = claims.echo_id.and_then(|raw| match UserId::new(&raw) {
            Ok(id) => Some(id),
            Err(error) => {
                warn!(%external_id, %error, "ignoring malformed echo_id claim");
                None
            }
        });
        Ok(Principal {
            external_id,
            local_id,
            onboarding_complete: claims.onboarded,
        })
    }

    /// Verify the bearer token carried in `headers`.
    pub fn verify_headers(&self, headers: &HeaderMap) -> Result<Principal, TokenRejected> {
        let token = bearer_token(headers)?;
        self.verify(token)
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenRejected> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(TokenRejected::Missing)?
        .to_str()
        .map_err(|_| TokenRejected::NotBearer)?;
    let (scheme, token) = value.split_once(' ').ok_or(TokenRejected::NotBearer)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(TokenRejected::NotBearer);
    }
    Ok(token)
}

impl FromRequest for Principal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(verifier) = req.app_data::<web::Data<BearerTokenVerifier>>() else {
            return ready(Err(Error::internal("bearer token verifier is not configured")));
        };
        let result = verifier.verify_headers(req.headers()).map_err(|rejection| {
            debug!(reason = %rejection, "rejected bearer token");
            Error::from(rejection)
        });
        ready(result)
    }
}

impl FromRequest for OnboardedPrincipal {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let result = Principal::from_request(req, payload)
            .into_inner()
            .and_then(|principal| {
                let external_id = principal.external_id.clone();
                Self::try_from(principal).map_err(|reason| {
                    debug!(%external_id, %reason, "refused principal without onboarding");
                    Error::from(reason)
                })
            });
        ready(result)
    }
}
