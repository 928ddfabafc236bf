use sqlx::FromRow;

use crate::{categories::dto::Category, db::decode_timestamp, expenses::dto::Expense};

/// Expense joined with its category, as selected by every expense query.
#[derive(Debug, FromRow)]
pub struct ExpenseRow {
    pub id: i64,
    pub name: String,
    pub price: i64,
    pub created_at: String,
    pub category_id: i64,
    pub category_name: String,
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = anyhow::Error;

    fn try_from(row: ExpenseRow) -> Result<Self, Self::Error> {
        Ok(Expense {
            id: row.id,
            name: row.name,
            price: row.price,
            created_at: decode_timestamp(&row.created_at)?,
            category: Category {
                id: row.category_id,
                name: row.category_name,
            },
        })
    }
}

/// Projection matching [ExpenseRow]; callers append the WHERE clause.
pub(crate) const SELECT_EXPENSES: &str = "SELECT e.id, e.name, e.price, e.created_at, \
     e.category_id, c.name AS category_name \
     FROM expenses e JOIN categories c ON c.id = e.category_id";
