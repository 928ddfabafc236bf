use std::cmp::Ordering;

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, instrument};

use crate::{error::AppResult, reports::month::Month};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub total: i64,
    pub average: f64,
    pub max: i64,
}

#[derive(Debug, FromRow)]
struct MonthAggregate {
    count: i64,
    total: i64,
    max: i64,
}

/// `total / count` in hundredths, rounded half to even.
fn average_hundredths(total: i64, count: i64) -> i128 {
    if count == 0 {
        return 0;
    }
    let num = i128::from(total) * 100;
    let den = i128::from(count);
    let (q, r) = (num / den, num % den);
    match (2 * r).cmp(&den) {
        Ordering::Less => q,
        Ordering::Greater => q + 1,
        Ordering::Equal if q % 2 == 0 => q,
        Ordering::Equal => q + 1,
    }
}

/// Sum, average and maximum of the owner's expenses created in `month` of any year.
/// A month without expenses yields all zeros.
#[instrument(skip(db))]
pub async fn monthly_statistics(db: &SqlitePool, owner_id: i64, month: Month) -> AppResult<Statistics> {
    let agg = sqlx::query_as::<_, MonthAggregate>(
        r#"
        SELECT COUNT(*)                 AS count,
               COALESCE(SUM(price), 0)  AS total,
               COALESCE(MAX(price), 0)  AS max
        FROM expenses
        WHERE user_id = ? AND strftime('%m', created_at) = ?
        "#,
    )
    .bind(owner_id)
    .bind(month.as_sql())
    .fetch_one(db)
    .await?;

    let stats = Statistics {
        total: agg.total,
        average: average_hundredths(agg.total, agg.count) as f64 / 100.0,
        max: agg.max,
    };
    debug!(count = agg.count, total = stats.total, "monthly statistics");
    Ok(stats)
}
