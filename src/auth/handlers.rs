use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RefreshRequest, RegisterRequest, TokenResponse},
        jwt::{AuthUser, JwtKeys},
        services,
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let Json(payload) = payload?;
    let user = services::register(&state.db, &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    State(keys): State<JwtKeys>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let tokens = services::login(&state.db, &keys, &payload.email, &payload.password).await?;
    Ok(Json(tokens))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    State(keys): State<JwtKeys>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Json(payload) = payload?;
    let tokens = services::refresh(&state.db, &keys, &payload.refresh_token).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicUser>> {
    Ok(Json(services::me(&state.db, user_id).await?))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use tower::ServiceExt;

    use crate::{app::build_app, test_utils::test_state};

    use super::*;

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_login_me_over_http() {
        let app = build_app(test_state().await);
        let creds = serde_json::json!({"email": "web@example.com", "password": "111111Aa"});

        let res = app
            .clone()
            .oneshot(json_post("/api/v1/auth/register", creds.clone()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(read_json(res).await["email"], "web@example.com");

        let res = app
            .clone()
            .oneshot(json_post("/api/v1/auth/register", creds.clone()))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);

        let res = app
            .clone()
            .oneshot(json_post("/api/v1/auth/login", creds))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let token = read_json(res).await["access_token"]
            .as_str()
            .unwrap()
            .to_owned();

        let res = app
            .oneshot(
                Request::get("/api/v1/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(read_json(res).await["email"], "web@example.com");
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let app = build_app(test_state().await);
        let res = app
            .oneshot(json_post("/api/v1/auth/login", serde_json::json!({"email": 5})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
