use anyhow::Context;
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterRequest, TokenResponse},
        password::{hash_password, verify_password, PasswordError},
    },
    error::ApiError,
    state::AppState,
    store::{NewUser, User},
};

const LOGIN_FAILED: &str = "User Not Found or Password is not be Correct";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// 30 random bytes as 60 lowercase hex characters.
pub(crate) fn generate_api_key() -> String {
    let mut bytes = [0u8; 30];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub async fn register(state: &AppState, payload: RegisterRequest) -> Result<User, ApiError> {
    // stored as submitted so login by exact name finds the same record
    let RegisterRequest {
        name,
        email,
        password,
    } = payload;

    if name.trim().is_empty() {
        return Err(ApiError::Validation("name must not be empty".into()));
    }
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(ApiError::Validation("email is not a valid address".into()));
    }

    if state.store.find_user_by_name(&name).await?.is_some() {
        warn!(name = %name, "name already registered");
        return Err(ApiError::Conflict("Username is Already Exist".into()));
    }
    if state.store.find_user_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("Email is Already Exist".into()));
    }

    let password_hash = hash_password(&password).map_err(|e| match e {
        e @ PasswordError::InputTooLong => ApiError::Validation(e.to_string()),
        other => ApiError::Internal(anyhow::Error::new(other).context("hash password")),
    })?;

    // the unique constraints still catch a concurrent registration of the same name/email
    let user = state
        .store
        .insert_user(NewUser {
            name,
            email,
            password_hash,
            api_key: generate_api_key(),
        })
        .await?;

    info!(user_id = %user.id, name = %user.name, "user registered");
    Ok(user)
}

/// Unknown user and wrong password fail identically.
pub async fn login(state: &AppState, form: LoginForm) -> Result<TokenResponse, ApiError> {
    let Some(user) = state.store.find_user_by_name(&form.username).await? else {
        warn!(name = %form.username, "login unknown user");
        return Err(ApiError::NotFound(LOGIN_FAILED.into()));
    };

    let ok = verify_password(&form.password, &user.password_hash)
        .with_context(|| format!("verify password for user {}", user.id))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::NotFound(LOGIN_FAILED.into()));
    }

    let access_token = state.keys.issue(user.id).context("issue access token")?;
    info!(user_id = %user.id, "user logged in");
    Ok(TokenResponse::bearer(access_token))
}
