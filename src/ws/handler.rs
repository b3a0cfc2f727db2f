//! WebSocket upgrade handler

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::matchmaking::queue::sanitize_nickname;
use crate::util::rate_limit::RateLimit;
use crate::ws::connection::Connection;

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Requested nickname, sanitized before use
    #[serde(default)]
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    if !origin_allowed(origin, &state.config.allowed_origins) {
        warn!(origin = ?origin, "Rejected WebSocket origin");
        return StatusCode::FORBIDDEN.into_response();
    }

    let ip = state.limiter.real_ip(&headers, remote);
    if !state.limiter.connect_allowed(ip) {
        warn!(
            ip = %ip,
            connections = state.limiter.connections_for(ip),
            "Too many connections from IP"
        );
        return StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    let nickname = sanitize_nickname(query.name.as_deref().unwrap_or_default());
    let limiter = state.limiter.clone();

    ws.max_message_size(state.config.max_message_bytes)
        .on_failed_upgrade(move |e| {
            debug!(ip = %ip, error = %e, "WebSocket upgrade failed");
            limiter.disconnect(ip);
        })
        .on_upgrade(move |socket| handle_socket(socket, ip, nickname, state))
}

/// Drive one upgraded socket until it closes
async fn handle_socket(socket: WebSocket, ip: IpAddr, nickname: String, state: AppState) {
    let id = state.matchmaking.admit();
    let (conn, io) = Connection::new(id, ip, nickname);
    info!(conn_id = %conn.id, ip = %ip, nickname = %conn.nickname(), "New WebSocket connection");

    let limiter: Arc<dyn RateLimit> = state.limiter.clone();
    io.spawn(conn.clone(), socket, Some(limiter));

    let pairing = state.matchmaking.try_match(conn.clone());
    debug!(conn_id = %conn.id, pairing = ?pairing, "Connection handed to matchmaking");

    conn.closed().await;
    state.limiter.disconnect(ip);

    info!(conn_id = %conn.id, "WebSocket connection closed");
}

/// Check an `Origin` header against host patterns.
///
/// No patterns allows everything. Requests without an origin (non-browser
/// clients) pass. `*.example.com` matches any subdomain of `example.com`.
pub fn origin_allowed(origin: Option<&str>, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    let Some(origin) = origin else {
        return true;
    };
    let Some(host) = origin_host(origin) else {
        return false;
    };

    patterns.iter().any(|pattern| match pattern.strip_prefix("*.") {
        Some(domain) => host
            .strip_suffix(domain.to_ascii_lowercase().as_str())
            .is_some_and(|sub| sub.len() > 1 && sub.ends_with('.')),
        None => host.eq_ignore_ascii_case(pattern),
    })
}

/// `https://Play.Example.com:8443/x` -> `play.example.com`
fn origin_host(origin: &str) -> Option<String> {
    let rest = origin.split_once("://").map_or(origin, |(_, rest)| rest);
    let authority = rest.split('/').next()?;
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => authority,
    };
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}
