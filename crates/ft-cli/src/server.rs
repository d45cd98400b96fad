//! Collector HTTP API.
//!
//! - `POST /` stores a session report sent by `ft track` or the extension.
//! - `GET /` serves the weekly report page, which charts `/browser_data`.
//! - `GET /report.txt` renders the weekly report as plain text.
//! - `GET /browser_data` returns the weekly report as chart-ready JSON.
//! - `GET /health` reports that the collector is up.

use std::sync::{Arc, Mutex, PoisonError};

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, extract::State};
use chrono::{Local, Utc};
use ft_core::SessionReport;
use ft_db::Database;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::commands::report::{self, BrowserData, WeeklyUsage};

/// Weekly chart and top-sites table, refreshed from `/browser_data`.
const REPORT_PAGE: &str = include_str!("report_page.html");

/// Shared collector state.
pub struct AppState {
    db: Mutex<Database>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn weekly_usage(&self) -> Result<WeeklyUsage, ApiError> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        report::load_weekly_usage(&db, Local::now().date_naive(), &Local)
            .map_err(|err| ApiError::Internal(err.to_string()))
    }
}

/// Request failures, mapped to HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<ft_db::DbError> for ApiError {
    fn from(err: ft_db::DbError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(report_page).post(receive_report))
        .route("/report.txt", get(weekly_report_text))
        .route("/browser_data", get(browser_data))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn receive_report(
    State(state): State<Arc<AppState>>,
    Json(report): Json<SessionReport>,
) -> Result<StatusCode, ApiError> {
    report
        .validate()
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let id = state
        .db
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert_report(&report, Utc::now())?;
    tracing::debug!(
        id,
        tab_id = %report.tab_id,
        target = %report.target.as_str(),
        duration_ms = report.active_duration,
        "stored session"
    );
    Ok(StatusCode::OK)
}

pub async fn report_page() -> Html<&'static str> {
    Html(REPORT_PAGE)
}

pub async fn weekly_report_text(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    Ok(report::format_report(&state.weekly_usage()?))
}

pub async fn browser_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BrowserData>, ApiError> {
    Ok(Json(BrowserData::from(&state.weekly_usage()?)))
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "ft-collector".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
