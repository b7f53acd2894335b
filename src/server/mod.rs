mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

pub use state::{AppState, SharedService};

pub fn build_router(service: SharedService) -> Router {
    let state = Arc::new(AppState {
        service: Mutex::new(service),
    });

    Router::new()
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/weather-location", get(handlers::weather_location))
        .route("/api/suggest", get(handlers::suggest))
        .route("/api/reverse", get(handlers::reverse))
        .route("/api/favorites", get(handlers::favorites))
        .route("/api/history", get(handlers::history))
        .route("/api/summary", get(handlers::summary))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(host: &str, port: u16, service: SharedService) -> std::io::Result<()> {
    let app = build_router(service);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("weather locator API listening on http://{}", addr);
    eprintln!("  Weather Locator API listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{GeocodeMatch, GeocodingClient, LocationService, StaticGeocoder, UserLocationStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn city(display_name: &str, importance: f64) -> GeocodeMatch {
        GeocodeMatch {
            latitude: 41.8755616,
            longitude: -87.6244212,
            display_name: display_name.into(),
            place_type: "city".into(),
            place_class: "place".into(),
            importance,
            address: None,
        }
    }

    fn app() -> (Router, TempDir) {
        let springfields = (0..30)
            .map(|i| city(&format!("Springfield {i}, Some County, State {i}, United States"), 0.5))
            .collect();
        let geo = StaticGeocoder::new()
            .with_matches("chicago", vec![city("Chicago, Cook County, Illinois, United States", 0.8)])
            .with_matches("spring", springfields);

        let dir = TempDir::new().unwrap();
        let store = UserLocationStore::load_from(dir.path().join("user_locations.json"));
        let geocoder: Box<dyn GeocodingClient + Send> = Box::new(geo);
        (build_router(LocationService::new(geocoder, store)), dir)
    }

    async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let cache_control = response
            .headers()
            .get(header::CACHE_CONTROL)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, cache_control, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_resolve_then_summary() {
        let (app, _dir) = app();

        let (status, cache_control, body) = get(&app, "/api/resolve?query=chicago").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_eq!(body["location"]["short_name"], "Chicago, Illinois");
        assert_eq!(body["source"], "geocoding");

        let (_, _, body) = get(&app, "/api/resolve?query=Chicago").await;
        assert_eq!(body["source"], "cache");

        let (status, _, body) = get(&app, "/api/summary").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cache_count"], 1);
        assert_eq!(body["history_count"], 0);
    }

    #[tokio::test]
    async fn test_not_found_error_body() {
        let (app, _dir) = app();

        let (status, cache_control, body) = get(&app, "/api/resolve?query=Atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(cache_control.as_deref(), Some("no-store"));
        assert_eq!(body["error"], "Could not find location 'Atlantis'");
        assert_eq!(body["code"], 404);
        assert_eq!(body["suggestions"][0], "Check spelling of 'Atlantis'");
    }

    #[tokio::test]
    async fn test_validation_and_missing_params_are_bad_requests() {
        let (app, _dir) = app();

        let (status, _, body) = get(&app, "/api/resolve?query=x").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
        assert!(body["suggestions"].as_array().is_some_and(|s| !s.is_empty()));

        let (status, _, body) = get(&app, "/api/reverse?lat=40.7").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("suggestions").is_none());

        let (status, _, _) = get(&app, "/api/reverse?lat=95&lon=0").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_suggest_limit_clamped() {
        let (app, _dir) = app();

        let (status, _, body) = get(&app, "/api/suggest?q=spring&limit=100").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 20);

        let (_, _, body) = get(&app, "/api/suggest?q=spring&limit=0").await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, _, body) = get(&app, "/api/suggest?q=spring").await;
        assert_eq!(body.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_saved_lists_start_empty() {
        let (app, _dir) = app();
        let (status, _, body) = get(&app, "/api/favorites").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::Array(Vec::new()));
        let (_, _, body) = get(&app, "/api/history").await;
        assert_eq!(body, Value::Array(Vec::new()));
    }
}
