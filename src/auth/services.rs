use lazy_static::lazy_static;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{PublicUser, TokenResponse},
        jwt::JwtKeys,
        password::{check_strength, hash_password, verify_password},
        repo_types::User,
    },
    error::{AppError, AppResult},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Hash checked against when the email is unknown, so both login failures cost one argon2 verify.
fn decoy_hash() -> Option<&'static str> {
    lazy_static! {
        static ref DECOY_HASH: Option<String> = hash_password("decoy-password-1A").ok();
    }
    DECOY_HASH.as_deref()
}

fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::invalid("email", "Invalid email address"));
    }
    Ok(email)
}

fn issue_pair(keys: &JwtKeys, user_id: i64) -> AppResult<TokenResponse> {
    let access_token = keys.sign_access(user_id)?;
    let refresh_token = keys.sign_refresh(user_id)?;
    Ok(TokenResponse::bearer(access_token, refresh_token))
}

#[instrument(skip(db, password))]
pub async fn register(db: &SqlitePool, email: &str, password: &str) -> AppResult<PublicUser> {
    let email = normalize_email(email)?;
    check_strength(password)?;

    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::UserAlreadyExists);
    }

    let hash = hash_password(password)?;
    let user = User::create(db, &email, &hash).await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(PublicUser {
        id: user.id,
        email: user.email,
    })
}

#[instrument(skip(db, keys, password))]
pub async fn login(
    db: &SqlitePool,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> AppResult<TokenResponse> {
    let email = email.trim().to_lowercase();

    let Some(user) = User::find_by_email(db, &email).await? else {
        if let Some(decoy) = decoy_hash() {
            let _ = verify_password(password, decoy);
        }
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(password, &user.password_hash)? {
        warn!(email = %email, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, "user logged in");
    issue_pair(keys, user.id)
}

#[instrument(skip_all)]
pub async fn refresh(db: &SqlitePool, keys: &JwtKeys, refresh_token: &str) -> AppResult<TokenResponse> {
    let claims = keys.verify_refresh(refresh_token).map_err(|e| {
        warn!(error = %e, "refresh rejected");
        AppError::Unauthorized("Invalid refresh token")
    })?;

    if User::find_by_id(db, claims.sub).await?.is_none() {
        warn!(user_id = claims.sub, "refresh for unknown user");
        return Err(AppError::Unauthorized("User not found"));
    }

    issue_pair(keys, claims.sub)
}

#[instrument(skip(db))]
pub async fn me(db: &SqlitePool, user_id: i64) -> AppResult<PublicUser> {
    let user = User::find_by_id(db, user_id)
        .await?
        .ok_or(AppError::Unauthorized("User not found"))?;
    Ok(PublicUser {
        id: user.id,
        email: user.email,
    })
}
