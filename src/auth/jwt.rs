use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{auth::claims::Claims, config::JwtConfig, error::ApiError, state::AppState, store::User};

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, wrong algorithm, malformed or expired claims, or no subject.
    #[error("token is invalid or expired")]
    Invalid,

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,

    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Signing and verification keys, built once from [`JwtConfig`].
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    header: Header,
    validation: Validation,
    ttl: TimeDuration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        // only the configured algorithm is accepted, and expiry has no grace period
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            header: Header::new(config.algorithm),
            validation,
            ttl: TimeDuration::seconds(config.ttl_minutes.saturating_mul(60)),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String, TokenError> {
        let exp = OffsetDateTime::now_utc()
            .checked_add(self.ttl)
            .ok_or(TokenError::ExpiryOutOfRange)?;
        let claims = Claims {
            id: Some(user_id.to_string()),
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&self.header, &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Returns the subject user id carried by a valid token.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            TokenError::Invalid
        })?;
        match data.claims.id {
            Some(id) if !id.is_empty() => {
                debug!(user_id = %id, "jwt verified");
                Ok(id)
            }
            _ => Err(TokenError::Invalid),
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header; the scheme is case-insensitive.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated principal: the user named by a valid bearer token.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or_else(|| {
            debug!("missing bearer token");
            ApiError::Unauthorized
        })?;

        let subject = state.keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            ApiError::Unauthorized
        })?;
        let user_id = Uuid::parse_str(&subject).map_err(|_| {
            warn!(subject = %subject, "token subject is not a user id");
            ApiError::Unauthorized
        })?;

        match state.store.find_user_by_id(user_id).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                warn!(user_id = %user_id, "token subject no longer exists");
                Err(ApiError::Unauthorized)
            }
        }
    }
}
