//! HTTP surface of the recipe server.
//!
//! - `GET /health`: health check (no auth)
//! - `POST /users/login`: exchange email/password for a bearer token
//! - `GET /recipes[?all=true]`: the caller's recipes, or everyone's
//! - `POST /recipes`: create a recipe (201, 409 on a taken id, 400 otherwise)
//! - `DELETE /recipes/{id}`: delete one of the caller's recipes (204)

use axum::{
    extract::{rejection::JsonRejection, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use recipe_sync_core::remote::wire::{
    BackendRecipe, ErrorResponse, LoginData, LoginRequest, LoginResponse, RecipeRequest,
    RecipeResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use super::storage::{RecipeDatabase, Rejection};
use super::tokens::TokenStore;
use super::users::{AuthError, UserStore};

/// Shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<Mutex<RecipeDatabase>>,
    pub users: Arc<UserStore>,
    pub tokens: Arc<TokenStore>,
}

impl AppState {
    pub fn new(recipes: RecipeDatabase, users: UserStore, tokens: Arc<TokenStore>) -> Self {
        Self {
            recipes: Arc::new(Mutex::new(recipes)),
            users: Arc::new(users),
            tokens,
        }
    }
}

/// Added to request extensions once the bearer token checks out.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub username: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let error = status.canonical_reason().unwrap_or("Error").to_string();
    (
        status,
        Json(ErrorResponse {
            message: message.into(),
            data: None,
            error,
        }),
    )
        .into_response()
}

async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return error_response(StatusCode::UNAUTHORIZED, "Authentication Token is missing!");
    };

    match state.tokens.validate(token) {
        Some(username) => {
            request.extensions_mut().insert(AuthUser { username });
            next.run(request).await
        }
        None => error_response(StatusCode::UNAUTHORIZED, "Invalid Authentication token!"),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(request)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, AuthError::MissingFields.to_string());
    };

    match state.users.authenticate(&request.email, &request.password) {
        Ok(user) => {
            let token = state.tokens.issue(&user.username);
            tracing::info!("User {} logged in", user.username);
            Json(LoginResponse {
                message: Some("Successfully fetched auth token".to_string()),
                data: LoginData {
                    email: Some(user.email.clone()),
                    username: user.username.clone(),
                    token,
                },
            })
            .into_response()
        }
        Err(e) => {
            tracing::info!("Login refused for {}: {}", request.email, e);
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default)]
    all: bool,
}

async fn list_recipes(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ListParams>,
) -> Json<Vec<BackendRecipe>> {
    let recipes = state.recipes.lock().await;
    Json(recipes.list(&user.username, params.all))
}

fn rejection_response(rejection: Rejection) -> Response {
    let status = match &rejection {
        Rejection::Exists(_) => StatusCode::CONFLICT,
        Rejection::Storage(e) => {
            tracing::error!("Recipe storage failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Rejection::EmptyTitle
        | Rejection::IdOutOfRange(_)
        | Rejection::NotFound(_)
        | Rejection::NotOwner(_) => StatusCode::BAD_REQUEST,
    };
    error_response(status, rejection.to_string())
}

async fn create_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<RecipeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };

    let mut recipes = state.recipes.lock().await;
    match recipes.create(&user.username, request) {
        Ok(recipe) => (
            StatusCode::CREATED,
            Json(RecipeResponse {
                message: Some("Recipe created successfully".to_string()),
                recipe,
            }),
        )
            .into_response(),
        Err(rejection) => rejection_response(rejection),
    }
}

async fn delete_recipe(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Response {
    let mut recipes = state.recipes.lock().await;
    match recipes.delete(&user.username, id) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(rejection) => rejection_response(rejection),
    }
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/users/login", post(login));

    let protected_routes = Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/{id}", delete(delete_recipe))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
