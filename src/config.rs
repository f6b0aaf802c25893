use std::str::FromStr;

use anyhow::{bail, Context};
use jsonwebtoken::Algorithm;

/// Upper bound on token lifetime (about a century) so expiry stays a valid date.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 366 * 100;

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Every setting is required; a missing or malformed value aborts startup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| -> anyhow::Result<String> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => Ok(v),
                _ => bail!("{key} must be set"),
            }
        };

        let database_url = required("DATABASE_URL")?;
        let secret = required("JWT_SECRET")?;
        let algorithm = parse_algorithm(&required("JWT_ALGORITHM")?)?;
        let ttl_raw = required("JWT_TTL_MINUTES")?;
        let ttl_minutes = ttl_raw
            .trim()
            .parse::<i64>()
            .with_context(|| format!("JWT_TTL_MINUTES is not an integer: {ttl_raw}"))?;
        if ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive, got {ttl_minutes}");
        }
        if ttl_minutes > MAX_TTL_MINUTES {
            bail!("JWT_TTL_MINUTES must be at most {MAX_TTL_MINUTES}, got {ttl_minutes}");
        }

        Ok(Self {
            database_url,
            jwt: JwtConfig {
                secret,
                algorithm,
                ttl_minutes,
            },
        })
    }
}

/// Only HMAC algorithms can be keyed from a shared secret string.
fn parse_algorithm(raw: &str) -> anyhow::Result<Algorithm> {
    let alg = Algorithm::from_str(raw.trim())
        .with_context(|| format!("JWT_ALGORITHM is not a known algorithm: {raw}"))?;
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(alg),
        other => bail!("JWT_ALGORITHM {other:?} needs a key pair; use HS256, HS384 or HS512"),
    }
}
