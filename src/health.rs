use axum::extract::State;
use serde::Serialize;

use crate::{
    error::{ApiResult, Envelope},
    state::AppState,
    timestamp::Timestamp,
};

pub const ENDPOINTS: &[&str] = &[
    "GET /",
    "POST /api/register",
    "POST /api/login",
    "POST /api/verify",
    "GET /api/users",
    "GET /api/user/:userId",
    "PUT /api/user/:userId",
    "GET /api/user/:userId/projects",
    "POST /api/projects",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: Timestamp,
    pub store_available: bool,
    pub endpoints: &'static [&'static str],
}

pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    Ok(Envelope::ok(HealthResponse {
        status: "Server is running",
        timestamp: Timestamp::now(),
        store_available: state.store_available,
        endpoints: ENDPOINTS,
    }))
}
