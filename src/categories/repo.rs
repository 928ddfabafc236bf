use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    categories::dto::Category,
    error::{is_unique_violation, AppError, AppResult},
};

impl Category {
    pub async fn list(db: &SqlitePool) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name
            FROM categories
            ORDER BY name, id
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn create(db: &SqlitePool, name: &str) -> AppResult<Category> {
        sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name)
            VALUES (?)
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::CategoryAlreadyExists
            } else {
                AppError::Database(e)
            }
        })
    }

    /// Used by expense mutations inside their transaction.
    pub async fn exists(conn: &mut SqliteConnection, id: i64) -> AppResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(found.is_some())
    }
}
