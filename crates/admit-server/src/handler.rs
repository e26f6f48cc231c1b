use admit_engine::{ActivationResult, ConfirmResult, HeaderRule, ImportSummary, PassStatus, RejectReason};
use axum::extract::State;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ServerResult;
use crate::state::AppState;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivateStatus {
    Activated,
    AlreadyActivated,
    NotFound,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub status: ActivateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
}

impl From<ActivationResult> for ActivateResponse {
    fn from(result: ActivationResult) -> Self {
        let activated_at = result.record().and_then(|r| r.activated_at);
        let status = match result {
            ActivationResult::Activated(_) => ActivateStatus::Activated,
            ActivationResult::AlreadyActivated(_) => ActivateStatus::AlreadyActivated,
            ActivationResult::NotFound => ActivateStatus::NotFound,
        };
        Self {
            status,
            activated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: PassStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmStatus {
    Confirmed,
    Rejected,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub status: ConfirmStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
}

impl From<ConfirmResult> for ConfirmResponse {
    fn from(result: ConfirmResult) -> Self {
        match result {
            ConfirmResult::Confirmed => Self {
                status: ConfirmStatus::Confirmed,
                reason: None,
            },
            ConfirmResult::Rejected(reason) => Self {
                status: ConfirmStatus::Rejected,
                reason: Some(reason),
            },
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRequest {
    pub lines: Vec<String>,
    /// Overrides the server's configured header rule.
    #[serde(default)]
    pub header_rule: Option<HeaderRule>,
}

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> ServerResult<Json<serde_json::Value>> {
    let records = state.engine.store().count()?;
    Ok(Json(json!({
        "name": "admit-server",
        "version": env!("CARGO_PKG_VERSION"),
        "records": records,
        "validity_window_secs": state.engine.config().validity_window_secs,
        "header_rule": state.header_rule,
    })))
}

pub async fn activate_handler(
    State(state): State<AppState>,
    Json(req): Json<CodeRequest>,
) -> ServerResult<Json<ActivateResponse>> {
    let result = state.engine.activate(&req.code, state.clock.now())?;
    Ok(Json(result.into()))
}

pub async fn verify_handler(
    State(state): State<AppState>,
    Json(req): Json<CodeRequest>,
) -> ServerResult<Json<VerifyResponse>> {
    let status = state.engine.verify(&req.code, state.clock.now())?;
    Ok(Json(VerifyResponse { status }))
}

pub async fn confirm_handler(
    State(state): State<AppState>,
    Json(req): Json<CodeRequest>,
) -> ServerResult<Json<ConfirmResponse>> {
    let result = state.engine.confirm_use(&req.code, state.clock.now())?;
    Ok(Json(result.into()))
}

pub async fn import_handler(
    State(state): State<AppState>,
    Json(req): Json<ImportRequest>,
) -> ServerResult<Json<ImportSummary>> {
    let rule = req.header_rule.unwrap_or(state.header_rule);
    let summary = state
        .engine
        .bulk_import(req.lines.as_slice(), |line| rule.looks_like_code(line))?;
    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        %rule,
        "codes imported"
    );
    Ok(Json(summary))
}
