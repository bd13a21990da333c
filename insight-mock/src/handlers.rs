/// Axum HTTP handlers for Insight API endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::ledger::{ActivityLedger, Mode};
use crate::types::*;

/// Shared application state
pub type AppState = Arc<ActivityLedger>;

/// Custom error type for handlers
pub enum ApiError {
    BadRequest(String),
    Unavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        (status, message).into_response()
    }
}

fn answer(ledger: &ActivityLedger, req: &AddrsTxsRequest) -> Result<Response, ApiError> {
    let addresses = req.addresses();
    if addresses.is_empty() {
        return Err(ApiError::BadRequest("Missing addrs".to_string()));
    }

    match ledger.mode() {
        Mode::Outage => Err(ApiError::Unavailable("Insight backend offline".to_string())),
        Mode::Malformed => Ok(Json(serde_json::json!({ "items": [] })).into_response()),
        Mode::Normal => {
            let total_items = ledger.total_items(&addresses);
            log::debug!("{} addresses -> {} txs", addresses.len(), total_items);
            Ok(Json(AddrsTxsResponse {
                total_items,
                from: req.from,
                to: req.to,
                items: Vec::new(),
            })
            .into_response())
        }
    }
}

/// POST /api/addrs/txs
/// Form fields `addrs` (comma-separated), `from`, `to`
pub async fn post_addrs_txs(
    State(ledger): State<AppState>,
    Form(req): Form<AddrsTxsRequest>,
) -> Result<Response, ApiError> {
    answer(&ledger, &req)
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub from: u64,
    #[serde(default)]
    pub to: u64,
}

/// GET /api/addrs/{addrs}/txs
pub async fn get_addrs_txs(
    State(ledger): State<AppState>,
    Path(addrs): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let req = AddrsTxsRequest {
        addrs,
        from: range.from,
        to: range.to,
    };
    answer(&ledger, &req)
}

// ============================================================================
// MOCK CONTROL ENDPOINTS (not part of the Insight API)
// ============================================================================

/// POST /mock/activity
/// Set transaction counts for addresses
pub async fn set_activity(
    State(ledger): State<AppState>,
    Json(req): Json<SetActivityRequest>,
) -> Json<SetActivityResponse> {
    for (address, count) in &req.activity {
        ledger.set_activity(address, *count);
    }
    log::info!("Updated activity for {} addresses", req.activity.len());

    Json(SetActivityResponse {
        updated: req.activity.len(),
        known_addresses: ledger.known_addresses(),
    })
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: Mode,
}

/// POST /mock/mode
pub async fn set_mode(
    State(ledger): State<AppState>,
    Json(req): Json<ModeRequest>,
) -> StatusCode {
    ledger.set_mode(req.mode);
    StatusCode::NO_CONTENT
}

/// GET /mock/requests
/// Number of activity queries answered so far
pub async fn request_stats(State(ledger): State<AppState>) -> Json<RequestStats> {
    Json(RequestStats {
        served: ledger.served(),
    })
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}
