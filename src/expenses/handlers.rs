use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::AppResult,
    expenses::{
        dto::{
            CreateExpenseRequest, Expense, ExpensePatch, ListQuery, NewExpense, Page,
            UpdateExpenseRequest,
        },
        filter::ListParams,
        repo,
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses))
        .route("/expenses/:id", get(get_expense))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", axum::routing::post(create_expense))
        .route(
            "/expenses/:id",
            axum::routing::put(update_expense).delete(delete_expense),
        )
}

#[instrument(skip(state, query))]
pub async fn list_expenses(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> AppResult<Json<Page<Expense>>> {
    let Query(query) = query?;
    let params = ListParams::try_from(query)?;
    Ok(Json(repo::list(&state.db, user_id, &params).await?))
}

#[instrument(skip(state, id))]
pub async fn get_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Expense>> {
    let Path(id) = id?;
    Ok(Json(repo::get(&state.db, user_id, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateExpenseRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Expense>)> {
    let Json(payload) = payload?;
    let new = NewExpense::try_from(payload)?;
    let expense = repo::create(&state.db, user_id, &new).await?;
    info!(user_id, expense_id = expense.id, "expense created");
    Ok((StatusCode::CREATED, Json(expense)))
}

#[instrument(skip(state, id, payload))]
pub async fn update_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateExpenseRequest>, JsonRejection>,
) -> AppResult<Json<Expense>> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let patch = ExpensePatch::try_from(payload)?;
    let expense = repo::update(&state.db, user_id, id, &patch).await?;
    info!(user_id, expense_id = id, "expense updated");
    Ok(Json(expense))
}

#[instrument(skip(state, id))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<i64>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = id?;
    repo::delete(&state.db, user_id, id).await?;
    info!(user_id, expense_id = id, "expense deleted");
    Ok(StatusCode::NO_CONTENT)
}
