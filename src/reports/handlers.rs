use axum::{
    body::Body,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::jwt::AuthUser,
    error::{AppError, AppResult},
    reports::{
        breakdown::{category_breakdown, CategoryTotal},
        export::{export_csv, ExportFilter, ExportQuery, EXPORT_FILENAME},
        month::Month,
        statistics::{monthly_statistics, Statistics},
    },
    state::AppState,
};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses/statistics/:month", get(get_statistics))
        .route("/expenses/breakdown/:month", get(get_breakdown))
        .route("/expenses/visualization/:month", get(get_visualization))
        .route("/expenses/export", get(export_report))
}

fn month_from(path: Result<Path<i64>, PathRejection>) -> AppResult<Month> {
    let Path(month) = path?;
    Month::try_from(month)
}

#[instrument(skip(state, month))]
pub async fn get_statistics(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    month: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Statistics>> {
    let month = month_from(month)?;
    Ok(Json(monthly_statistics(&state.db, user_id, month).await?))
}

#[instrument(skip(state, month))]
pub async fn get_breakdown(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    month: Result<Path<i64>, PathRejection>,
) -> AppResult<Json<Vec<CategoryTotal>>> {
    let month = month_from(month)?;
    Ok(Json(category_breakdown(&state.db, user_id, month).await?))
}

#[instrument(skip(state, month))]
pub async fn get_visualization(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    month: Result<Path<i64>, PathRejection>,
) -> AppResult<Response> {
    let month = month_from(month)?;
    let totals = category_breakdown(&state.db, user_id, month).await?;
    let title = format!("Expenses by category, month {}", month.number());
    let chart = state
        .charts
        .render(&title, &totals)
        .map_err(AppError::Internal)?;
    Ok(([(header::CONTENT_TYPE, chart.content_type)], chart.body).into_response())
}

#[instrument(skip(state, query))]
pub async fn export_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let filter = ExportFilter::try_from(query)?;
    let stream = export_csv(state.db.clone(), user_id, filter).await?;
    info!(user_id, "export started");

    let disposition = format!("attachment; filename=\"{EXPORT_FILENAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_owned()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}
