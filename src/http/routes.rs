//! HTTP route definitions

use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::app::AppState;
use crate::util::time::uptime_secs;
use crate::ws::handler::{origin_allowed, ws_handler};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let patterns = state.config.allowed_origins.clone();
    let allow_origin = if patterns.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin_allowed(origin.to_str().ok(), &patterns)
        })
    };

    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    active_rooms: usize,
    total_connections: u64,
    waiting_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.matchmaking.stats();

    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        active_rooms: stats.active_rooms,
        total_connections: stats.total_connections,
        waiting_players: stats.waiting_players,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn state() -> AppState {
        let config = Config::from_lookup(|_| None).expect("defaults should parse");
        AppState::new(config)
    }

    #[tokio::test]
    async fn test_health_reports_hub_counters() {
        let state = state();
        state.matchmaking.admit();
        state.matchmaking.admit();

        let Json(health) = health_handler(State(state)).await;
        assert_eq!(health.status, "ok");
        assert_eq!(health.active_rooms, 0);
        assert_eq!(health.total_connections, 2);
        assert_eq!(health.waiting_players, 0);
    }

    #[test]
    fn test_health_json_shape() {
        let body = serde_json::to_value(HealthResponse {
            status: "ok",
            uptime_secs: 5,
            active_rooms: 1,
            total_connections: 4,
            waiting_players: 1,
        })
        .expect("serializable");

        assert_eq!(body["status"], "ok");
        assert_eq!(body["uptime_secs"], 5);
        assert_eq!(body["active_rooms"], 1);
        assert_eq!(body["total_connections"], 4);
        assert_eq!(body["waiting_players"], 1);
    }
}
