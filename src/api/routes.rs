use crate::api::api_error::APIError;
use crate::api::model;
use crate::api::server::AppState;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::WithRejection;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

type PathParam = WithRejection<Path<String>, APIError>;

pub(super) fn new(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(health_check))
        .route("/pxelinux.cfg/:hex", get(config_from_hex))
        .route("/pxelinux.cfg/:hex/", get(config_from_hex))
        .route("/:hex", get(config_from_hex))
        .route("/:hex/", get(config_from_hex))
        .route("/ip/:addr", get(config_from_addr))
        .route("/group/:name", get(config_from_group))
        .route("/self", get(config_from_client))
        .route("/menu/:label/summary", get(menu_summary))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.api_timeout))
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn health_check() -> impl IntoResponse {
    Json(json!({"ok":"healthy"}))
}

async fn config_from_hex(
    State(state): State<AppState>,
    WithRejection(Path(hex), _): PathParam,
) -> Result<String, APIError> {
    let addr = model::addr_from_hex(&hex)?;
    boot_config(&state, addr).await
}

async fn config_from_addr(
    State(state): State<AppState>,
    WithRejection(Path(addr), _): PathParam,
) -> Result<String, APIError> {
    let addr = model::addr_from_str(&addr)?;
    boot_config(&state, addr).await
}

async fn config_from_client(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<String, APIError> {
    let addr = model::client_addr(&headers, &state.config.forwarded_header, peer);
    boot_config(&state, addr).await
}

async fn config_from_group(
    State(state): State<AppState>,
    WithRejection(Path(name), _): PathParam,
) -> Result<String, APIError> {
    let catalog = state.boot_store.read().await.snapshot().await;
    let now = state.config.time_of_day();
    tracing::debug!("configuration requested for machine group \"{name}\"");
    Ok(state.engine(&catalog).config_for_group(&name, now)?)
}

async fn menu_summary(
    State(state): State<AppState>,
    WithRejection(Path(label), _): PathParam,
) -> Result<String, APIError> {
    let catalog = state.boot_store.read().await.snapshot().await;
    Ok(state.engine(&catalog).menu_summary(&label)?)
}

async fn boot_config(state: &AppState, addr: IpAddr) -> Result<String, APIError> {
    let catalog = state.boot_store.read().await.snapshot().await;
    let now = state.config.time_of_day();
    let config = state.engine(&catalog).config_for_addr(addr, now)?;
    tracing::info!("served configuration for {addr}");
    Ok(config)
}
