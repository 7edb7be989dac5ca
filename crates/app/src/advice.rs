use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Response,
    Json,
};
use email_memory_core::{summarize, types::ApiEnvelope, ValidationResult};
use metrics::{counter, histogram};
use serde::Serialize;
use tracing::debug;

use crate::preference::{envelope, EmailPayload};
use crate::problem::ProblemResponse;
use crate::router::AppState;

pub const MSG_VALIDATED: &str = "Email validated";

/// Advisor result plus its one-line summary.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    #[serde(flatten)]
    pub result: ValidationResult,
    pub summary: String,
}

pub async fn validate(
    State(state): State<AppState>,
    payload: Result<Json<EmailPayload>, JsonRejection>,
) -> Result<Response, ProblemResponse> {
    let start = Instant::now();
    let Json(payload) = payload.map_err(ProblemResponse::from_json_rejection)?;

    let result = state.advisor().validate_value(&payload.email);
    let outcome = if result.is_valid { "valid" } else { "invalid" };
    counter!("advisor_evaluations_total", "outcome" => outcome).increment(1);

    let summary = summarize(&result);
    debug!(stage = "http", outcome, summary = %summary, "email advice computed");

    let report = ValidationReport { result, summary };
    histogram!("http_request_duration_seconds", "route" => "/api/validate")
        .record(start.elapsed().as_secs_f64());
    Ok(envelope(
        StatusCode::OK,
        ApiEnvelope::success(MSG_VALIDATED, Some(report), state.now()),
    ))
}
