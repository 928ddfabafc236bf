use std::str::FromStr;

use anyhow::Context;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime, UtcOffset};

use crate::config::AppConfig;

/// Open the connection pool described by the config.
pub async fn connect(config: &AppConfig) -> anyhow::Result<SqlitePool> {
    connect_url(&config.database_url, config.max_connections).await
}

pub async fn connect_url(database_url: &str, max_connections: u32) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("parse database url {database_url}"))?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &SqlitePool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Render a timestamp the way `expenses.created_at` stores it: UTC, millisecond precision.
///
/// Instants whose UTC year falls outside `0..=9999` cannot be stored, since the
/// text would no longer read back as RFC 3339.
pub fn encode_timestamp(at: OffsetDateTime) -> anyhow::Result<String> {
    let utc = to_storable_utc(at).context("timestamp out of storable range")?;
    let text = utc
        .format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        ))
        .context("format timestamp")?;
    Ok(text)
}

/// `at` moved to UTC, or `None` when that leaves years `0..=9999`.
pub fn to_storable_utc(at: OffsetDateTime) -> Option<OffsetDateTime> {
    at.checked_to_offset(UtcOffset::UTC)
        .filter(|utc| (0..=9999).contains(&utc.year()))
}

pub fn decode_timestamp(text: &str) -> anyhow::Result<OffsetDateTime> {
    OffsetDateTime::parse(text, &Rfc3339).with_context(|| format!("parse timestamp {text:?}"))
}
