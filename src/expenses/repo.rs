use anyhow::anyhow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, instrument};

use crate::{
    categories::dto::Category,
    db::encode_timestamp,
    error::{AppError, AppResult},
    expenses::{
        dto::{Expense, ExpensePatch, NewExpense, Page},
        filter::{push_filters, push_ordering, push_page, ListParams},
        repo_types::{ExpenseRow, SELECT_EXPENSES},
    },
};

async fn fetch_owned(
    conn: &mut SqliteConnection,
    owner_id: i64,
    id: i64,
) -> AppResult<Option<Expense>> {
    let mut qb = QueryBuilder::<Sqlite>::new(SELECT_EXPENSES);
    qb.push(" WHERE e.user_id = ")
        .push_bind(owner_id)
        .push(" AND e.id = ")
        .push_bind(id);
    let row = qb
        .build_query_as::<ExpenseRow>()
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(Expense::try_from).transpose()?)
}

async fn ensure_category(conn: &mut SqliteConnection, category_id: i64) -> AppResult<()> {
    if Category::exists(conn, category_id).await? {
        Ok(())
    } else {
        Err(AppError::CategoryNotFound)
    }
}

/// One filtered, sorted page of the owner's expenses plus the unpaged match count.
///
/// Both statements run in the same transaction so `total` and `items` see the same rows.
#[instrument(skip(db))]
pub async fn list(db: &SqlitePool, owner_id: i64, params: &ListParams) -> AppResult<Page<Expense>> {
    let mut tx = db.begin().await?;

    let mut count = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM expenses e JOIN categories c ON c.id = e.category_id",
    );
    push_filters(&mut count, owner_id, &params.filter);
    let total: i64 = count.build_query_scalar().fetch_one(&mut *tx).await?;

    let mut select = QueryBuilder::<Sqlite>::new(SELECT_EXPENSES);
    push_filters(&mut select, owner_id, &params.filter);
    push_ordering(&mut select, params.sort_by, params.order);
    push_page(&mut select, params.limit, params.offset);
    let rows = select
        .build_query_as::<ExpenseRow>()
        .fetch_all(&mut *tx)
        .await?;

    tx.commit().await?;

    let items = rows
        .into_iter()
        .map(Expense::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(total, returned = items.len(), "expenses listed");

    Ok(Page {
        items,
        total,
        limit: params.limit,
        offset: params.offset,
    })
}

pub async fn get(db: &SqlitePool, owner_id: i64, id: i64) -> AppResult<Expense> {
    let mut conn = db.acquire().await?;
    fetch_owned(&mut conn, owner_id, id)
        .await?
        .ok_or(AppError::ExpenseNotFound)
}

#[instrument(skip(db, new), fields(category_id = new.category_id))]
pub async fn create(db: &SqlitePool, owner_id: i64, new: &NewExpense) -> AppResult<Expense> {
    let created_at = new.created_at.map(encode_timestamp).transpose()?;

    let mut tx = db.begin().await?;
    ensure_category(&mut tx, new.category_id).await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO expenses (name, price, created_at, category_id, user_id)
        VALUES (?, ?, COALESCE(?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now')), ?, ?)
        RETURNING id
        "#,
    )
    .bind(&new.name)
    .bind(new.price)
    .bind(created_at)
    .bind(new.category_id)
    .bind(owner_id)
    .fetch_one(&mut *tx)
    .await?;

    let expense = fetch_owned(&mut tx, owner_id, id)
        .await?
        .ok_or_else(|| anyhow!("expense {id} missing right after insert"))?;
    tx.commit().await?;

    debug!(expense_id = id, "expense created");
    Ok(expense)
}

#[instrument(skip(db, patch))]
pub async fn update(
    db: &SqlitePool,
    owner_id: i64,
    id: i64,
    patch: &ExpensePatch,
) -> AppResult<Expense> {
    let mut tx = db.begin().await?;

    let current = fetch_owned(&mut tx, owner_id, id)
        .await?
        .ok_or(AppError::ExpenseNotFound)?;
    if let Some(category_id) = patch.category_id {
        ensure_category(&mut tx, category_id).await?;
    }
    if patch.is_empty() {
        return Ok(current);
    }

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE expenses SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(category_id) = patch.category_id {
            set.push("category_id = ").push_bind_unseparated(category_id);
        }
        if let Some(price) = patch.price {
            set.push("price = ").push_bind_unseparated(price);
        }
    }
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(" AND user_id = ")
        .push_bind(owner_id);
    qb.build().execute(&mut *tx).await?;

    let updated = fetch_owned(&mut tx, owner_id, id)
        .await?
        .ok_or(AppError::ExpenseNotFound)?;
    tx.commit().await?;

    debug!("expense updated");
    Ok(updated)
}

#[instrument(skip(db))]
pub async fn delete(db: &SqlitePool, owner_id: i64, id: i64) -> AppResult<()> {
    let mut tx = db.begin().await?;
    let result = sqlx::query("DELETE FROM expenses WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::ExpenseNotFound);
    }
    tx.commit().await?;
    debug!("expense deleted");
    Ok(())
}
