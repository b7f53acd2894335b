use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

use crate::location::store::UserState;
use crate::location::types::{SavedLocation, UserSummary};
use crate::location::{
    LocationError, ResolutionFailure, Resolved, ReverseAddress, Suggestion, WeatherLocation,
    DEFAULT_MAX_SUGGESTIONS,
};

use super::state::{AppState, SharedService};

const MAX_SUGGESTION_LIMIT: usize = 20;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<String>,
}

pub struct ApiError {
    status: StatusCode,
    message: String,
    suggestions: Vec<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message,
            code: self.status.as_u16(),
            suggestions: self.suggestions,
        };
        (self.status, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError {
        status,
        message: msg.into(),
        suggestions: Vec::new(),
    }
}

fn status_for(err: &LocationError) -> StatusCode {
    match err {
        LocationError::Validation(_) | LocationError::Coordinates(_) => StatusCode::BAD_REQUEST,
        LocationError::NotFound(_) | LocationError::NoDefaultLocation => StatusCode::NOT_FOUND,
        LocationError::Provider(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<ResolutionFailure> for ApiError {
    fn from(f: ResolutionFailure) -> Self {
        Self {
            status: status_for(&f.error),
            message: f.error.to_string(),
            suggestions: f.suggestions,
        }
    }
}

impl From<LocationError> for ApiError {
    fn from(e: LocationError) -> Self {
        api_error(status_for(&e), e.to_string())
    }
}

/// Run `f` against the shared service on the blocking pool. The lock is
/// only ever taken there, never on an async worker.
async fn with_service<T, F>(state: Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut SharedService) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut service = state
            .service
            .lock()
            .map_err(|_| api_error(StatusCode::INTERNAL_SERVER_ERROR, "location service unavailable"))?;
        Ok::<T, ApiError>(f(&mut service))
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub query: Option<String>,
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<Resolved>, ApiError> {
    let start = Instant::now();
    let query = params.query.unwrap_or_default();

    let q = query.clone();
    let resolved = with_service(state, move |svc| svc.resolve(&q)).await??;

    tracing::info!(
        "GET /api/resolve?query={} -> {} [{}] ({:.1}ms)",
        query,
        resolved.location.short_name,
        resolved.source,
        start.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(Json(resolved))
}

// ─── GET /api/weather-location ───────────────────────────────────

pub async fn weather_location(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<WeatherLocation>, ApiError> {
    let location = with_service(state, move |svc| svc.weather_location(params.query.as_deref())).await??;
    Ok(Json(location))
}

// ─── GET /api/suggest ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SuggestQuery {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

pub async fn suggest(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SuggestQuery>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let start = Instant::now();
    let partial = params.q.unwrap_or_default();
    let limit = params
        .limit
        .unwrap_or(DEFAULT_MAX_SUGGESTIONS)
        .clamp(1, MAX_SUGGESTION_LIMIT);

    let p = partial.clone();
    let suggestions = with_service(state, move |svc| svc.suggest(&p, limit)).await?;

    tracing::info!(
        "GET /api/suggest?q={} -> {} suggestions ({:.1}ms)",
        partial,
        suggestions.len(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(Json(suggestions))
}

// ─── GET /api/reverse ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ReverseQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReverseQuery>,
) -> Result<Json<ReverseAddress>, ApiError> {
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Provide 'lat' and 'lon' parameters"));
    };
    let address = with_service(state, move |svc| svc.reverse(&lat, &lon)).await??;
    Ok(Json(address))
}

// ─── Saved state ─────────────────────────────────────────────────

async fn read_state<T, F>(state: Arc<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&UserState) -> T + Send + 'static,
    T: Send + 'static,
{
    with_service(state, move |svc| f(svc.store().state())).await
}

pub async fn favorites(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SavedLocation>>, ApiError> {
    read_state(state, |s| s.favorites.clone()).await.map(Json)
}

pub async fn history(State(state): State<Arc<AppState>>) -> Result<Json<Vec<SavedLocation>>, ApiError> {
    read_state(state, |s| s.history.clone()).await.map(Json)
}

pub async fn summary(State(state): State<Arc<AppState>>) -> Result<Json<UserSummary>, ApiError> {
    read_state(state, UserState::summary).await.map(Json)
}
