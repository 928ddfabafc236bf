use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    categories::dto::{Category, CreateCategoryRequest},
    error::{AppError, AppResult},
    state::AppState,
};

pub fn category_routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories).post(create_category))
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(Category::list(&state.db).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let Json(payload) = payload?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::invalid("name", "Category name must not be empty"));
    }

    let category = Category::create(&state.db, name).await?;
    info!(category_id = category.id, name = %category.name, user_id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}
