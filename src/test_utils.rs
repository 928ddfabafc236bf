//! Fixtures shared by the unit tests: an in-memory database with migrations applied.
use std::{str::FromStr, sync::Arc};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::{
    auth::jwt::JwtKeys,
    config::{AppConfig, JwtConfig},
    db,
    reports::chart::{ChartRenderer, EChartsRenderer},
    state::AppState,
};

/// Every connection to `sqlite::memory:` is a separate database, so the pool
/// holds exactly one connection and never recycles it.
pub(crate) async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    db::migrate(&pool).await.unwrap();
    pool
}

pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        max_connections: 1,
        jwt: JwtConfig {
            secret: "test-secret".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
            refresh_ttl_minutes: 60,
        },
    }
}

pub(crate) fn test_keys() -> JwtKeys {
    JwtKeys::from(&test_config().jwt)
}

pub(crate) async fn test_state() -> AppState {
    let charts = Arc::new(EChartsRenderer) as Arc<dyn ChartRenderer>;
    AppState::from_parts(test_pool().await, Arc::new(test_config()), charts)
}

/// `Authorization` header value carrying a fresh access token for `user_id`.
pub(crate) fn bearer_for(state: &AppState, user_id: i64) -> String {
    let token = JwtKeys::from(&state.config.jwt).sign_access(user_id).unwrap();
    format!("Bearer {token}")
}

pub(crate) async fn insert_user(db: &SqlitePool, email: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO users (email, password_hash) VALUES (?, 'x') RETURNING id")
        .bind(email)
        .fetch_one(db)
        .await
        .unwrap()
}

pub(crate) async fn insert_category(db: &SqlitePool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO categories (name) VALUES (?) RETURNING id")
        .bind(name)
        .fetch_one(db)
        .await
        .unwrap()
}

/// `created_at` must already be in the stored `YYYY-MM-DDTHH:MM:SS.mmmZ` shape.
pub(crate) async fn insert_expense(
    db: &SqlitePool,
    user_id: i64,
    category_id: i64,
    name: &str,
    price: i64,
    created_at: &str,
) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO expenses (name, price, created_at, category_id, user_id)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(price)
    .bind(created_at)
    .bind(category_id)
    .bind(user_id)
    .fetch_one(db)
    .await
    .unwrap()
}
