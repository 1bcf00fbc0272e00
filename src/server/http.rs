use super::http_errors::map_command_error;
use super::http_types::{AlertResponse, BadgeResponse, HealthResponse, StatusResponse};
use super::state::AppState;
use crate::application::Command;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/messages", post(handle_message))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(OpenApi)]
#[openapi(
    paths(health_check, get_status, handle_message),
    components(schemas(HealthResponse, StatusResponse, BadgeResponse, AlertResponse)),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Monitor", description = "Quota badge, live alerts and the settings command channel"),
    ),
    info(
        title = "Quota Watch API",
        version = "0.1.0",
        description = "Per-account mailbox quota monitoring",
        license(name = "MIT")
    )
)]
struct ApiDoc;

/// Health check endpoint
///
/// Verifies database connectivity when settings are stored in Postgres.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let Some(pool) = &state.pool else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                error: None,
            }),
        );
    };

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                error: None,
            }),
        ),
        Err(e) => {
            error!(error = %e, "Health check failed: DB connectivity issue");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "unhealthy".to_string(),
                    error: Some("Database connectivity failed".to_string()),
                }),
            )
        }
    }
}

/// Current badge and live quota alerts
#[utoipa::path(
    get,
    path = "/status",
    tag = "Monitor",
    responses((status = 200, description = "Badge and live alerts", body = StatusResponse))
)]
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let badge = state.surface.badge().await.into();
    let alerts = state
        .surface
        .alerts()
        .await
        .into_iter()
        .map(AlertResponse::from)
        .collect();
    let check_interval_minutes = state
        .service
        .scheduler()
        .period()
        .map(|period| period.as_secs() / 60);

    Json(StatusResponse {
        badge,
        alerts,
        check_interval_minutes,
    })
}

/// Settings command channel
///
/// Accepts one command tagged by `type`: `get_account_configs`, `get_usage`,
/// `save_account_config`, `run_check`, `get_interval` or `set_interval`.
#[utoipa::path(
    post,
    path = "/messages",
    tag = "Monitor",
    request_body = Object,
    responses(
        (status = 200, description = "Command response", body = Object),
        (status = 400, description = "Invalid command", body = Object),
        (status = 404, description = "Unknown account", body = Object),
        (status = 502, description = "Mail store unavailable", body = Object),
        (status = 500, description = "Command failed", body = Object)
    )
)]
async fn handle_message(
    State(state): State<AppState>,
    Json(command): Json<Command>,
) -> impl IntoResponse {
    match state.service.handle_command(command).await {
        Ok(response) => (StatusCode::OK, Json(serde_json::json!(response))),
        Err(e) => {
            warn!(error = %e, "Command failed");
            let (status, body) = map_command_error(&e);
            (status, Json(body))
        }
    }
}
