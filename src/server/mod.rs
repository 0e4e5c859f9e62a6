use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::bot::Controller;
use crate::models::BotStatus;

pub fn router(controller: Arc<Controller>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .route("/trades", get(get_trades))
        .route("/trades/history", get(get_trade_history))
        .route("/start", post(start_bot))
        .route("/stop", post(stop_bot))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(controller)
}

async fn get_status(State(controller): State<Arc<Controller>>) -> impl IntoResponse {
    Json(controller.status())
}

async fn get_trades(State(controller): State<Arc<Controller>>) -> impl IntoResponse {
    let trades = controller.trades().await;
    Json(json!({ "trades": trades }))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    since: Option<String>,
}

async fn get_trade_history(
    State(controller): State<Arc<Controller>>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let since = params.since.as_deref().and_then(parse_since);
    let trades = controller.trade_history(since).await;
    Json(json!({ "trades": trades }))
}

async fn start_bot(State(controller): State<Arc<Controller>>) -> impl IntoResponse {
    match controller.start().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "Bot started successfully",
                "status": BotStatus::Running.as_str(),
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": e.to_string(),
                "status": controller.status().status.as_str(),
            })),
        ),
    }
}

async fn stop_bot(State(controller): State<Arc<Controller>>) -> impl IntoResponse {
    match controller.stop() {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "message": "Bot stopped successfully",
                "status": BotStatus::Stopped.as_str(),
            })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": e.to_string(),
                "status": controller.status().status.as_str(),
            })),
        ),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates
fn parse_since(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
