use std::collections::HashMap;

use anyhow::anyhow;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, instrument};

use crate::{
    error::{AppError, AppResult},
    reports::month::Month,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub label: String,
    pub value: i64,
}

/// Sum prices per label, keeping labels in order of first appearance.
/// A total that would overflow `i64` is an error.
pub fn group_by_category<I>(rows: I) -> AppResult<Vec<CategoryTotal>>
where
    I: IntoIterator<Item = (String, i64)>,
{
    let mut totals: Vec<CategoryTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for (label, price) in rows {
        match index.get(&label) {
            Some(&i) => {
                let slot = &mut totals[i];
                slot.value = slot
                    .value
                    .checked_add(price)
                    .ok_or_else(|| anyhow!("total of category {:?} overflows", slot.label))?;
            }
            None => {
                index.insert(label.clone(), totals.len());
                totals.push(CategoryTotal { label, value: price });
            }
        }
    }
    Ok(totals)
}

/// Per-category totals of the owner's expenses in `month`, or [AppError::NoDataFound].
#[instrument(skip(db))]
pub async fn category_breakdown(
    db: &SqlitePool,
    owner_id: i64,
    month: Month,
) -> AppResult<Vec<CategoryTotal>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT c.name, e.price
        FROM expenses e
        JOIN categories c ON c.id = e.category_id
        WHERE e.user_id = ? AND strftime('%m', e.created_at) = ?
        ORDER BY e.id
        "#,
    )
    .bind(owner_id)
    .bind(month.as_sql())
    .fetch_all(db)
    .await?;

    if rows.is_empty() {
        return Err(AppError::NoDataFound);
    }
    let totals = group_by_category(rows)?;
    debug!(categories = totals.len(), "category breakdown");
    Ok(totals)
}
