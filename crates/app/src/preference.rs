use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use email_memory_core::{
    preference::normalize_for_storage,
    types::{ApiEnvelope, EmailRecord, EmailStats},
};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::problem::ProblemResponse;
use crate::router::AppState;

pub const MSG_SAVED: &str = "Email saved successfully";
pub const MSG_SAVE_FAILED: &str = "Failed to save email to database";
pub const MSG_LOADED: &str = "Email loaded successfully";
pub const MSG_NOT_FOUND: &str = "No email found";
pub const MSG_LOAD_FAILED: &str = "Failed to load email from database";
pub const MSG_DELETED: &str = "Email preference deleted successfully";
pub const MSG_DELETE_FAILED: &str = "Failed to delete email preference";
pub const MSG_STATS: &str = "Email statistics retrieved successfully";
pub const MSG_STATS_FAILED: &str = "Failed to retrieve email statistics";

/// Request body shared by the save and validate endpoints.
///
/// `email` is kept as raw JSON so non-string values reach validation instead
/// of failing extraction.
#[derive(Debug, Deserialize)]
pub struct EmailPayload {
    #[serde(default)]
    pub email: Value,
}

pub(crate) fn envelope<T: Serialize>(status: StatusCode, body: ApiEnvelope<T>) -> Response {
    (status, Json(body)).into_response()
}

fn observe(op: &'static str, result: &'static str, route: &'static str, start: Instant) {
    counter!("preference_requests_total", "op" => op, "result" => result).increment(1);
    histogram!("http_request_duration_seconds", "route" => route)
        .record(start.elapsed().as_secs_f64());
}

pub async fn save(
    State(state): State<AppState>,
    payload: Result<Json<EmailPayload>, JsonRejection>,
) -> Result<Response, ProblemResponse> {
    let start = Instant::now();
    let Json(payload) = payload.map_err(|rejection| {
        observe("save", "rejected", "/api/preference", start);
        ProblemResponse::from_json_rejection(rejection)
    })?;
    let now = state.now();

    let email = match normalize_for_storage(&payload.email) {
        Ok(email) => email,
        Err(err) => {
            warn!(stage = "http", op = "save", reason = %err, "email rejected before storage");
            observe("save", "invalid", "/api/preference", start);
            return Ok(envelope(
                StatusCode::BAD_REQUEST,
                ApiEnvelope::<EmailRecord>::failure(err.to_string(), now),
            ));
        }
    };

    let response = match state
        .storage()
        .preferences()
        .save(state.document_id(), &email, now)
        .await
    {
        Ok(record) => {
            info!(
                stage = "storage",
                document_id = state.document_id(),
                domain = record.domain().unwrap_or_default(),
                "email saved"
            );
            observe("save", "ok", "/api/preference", start);
            envelope(StatusCode::OK, ApiEnvelope::success(MSG_SAVED, Some(record), now))
        }
        Err(err) => {
            error!(stage = "storage", error = %err, "failed to save email");
            observe("save", "error", "/api/preference", start);
            envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiEnvelope::<EmailRecord>::failure(MSG_SAVE_FAILED, now),
            )
        }
    };
    Ok(response)
}

pub async fn load(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let now = state.now();

    match state.storage().preferences().load(state.document_id()).await {
        Ok(Some(record)) => {
            info!(stage = "storage", document_id = state.document_id(), "email loaded");
            observe("load", "ok", "/api/preference", start);
            envelope(StatusCode::OK, ApiEnvelope::success(MSG_LOADED, Some(record), now))
        }
        Ok(None) => {
            info!(stage = "storage", document_id = state.document_id(), "no email stored");
            observe("load", "not_found", "/api/preference", start);
            envelope(
                StatusCode::NOT_FOUND,
                ApiEnvelope::<EmailRecord>::failure(MSG_NOT_FOUND, now),
            )
        }
        Err(err) => {
            error!(stage = "storage", error = %err, "failed to load email");
            observe("load", "error", "/api/preference", start);
            envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiEnvelope::<EmailRecord>::failure(MSG_LOAD_FAILED, now),
            )
        }
    }
}

pub async fn delete(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let now = state.now();

    match state.storage().preferences().delete(state.document_id()).await {
        Ok(removed) => {
            info!(stage = "storage", document_id = state.document_id(), removed, "email preference deleted");
            observe("delete", "ok", "/api/preference", start);
            envelope(StatusCode::OK, ApiEnvelope::<()>::success(MSG_DELETED, None, now))
        }
        Err(err) => {
            error!(stage = "storage", error = %err, "failed to delete email preference");
            observe("delete", "error", "/api/preference", start);
            envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiEnvelope::<()>::failure(MSG_DELETE_FAILED, now),
            )
        }
    }
}

pub async fn stats(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    let now = state.now();

    match state.storage().preferences().list_all().await {
        Ok(records) => {
            let stats = EmailStats::from_records(&records);
            info!(
                stage = "storage",
                total = stats.total_emails,
                domains = stats.domains.len(),
                "email statistics computed"
            );
            observe("stats", "ok", "/api/preference/stats", start);
            envelope(StatusCode::OK, ApiEnvelope::success(MSG_STATS, Some(stats), now))
        }
        Err(err) => {
            error!(stage = "storage", error = %err, "failed to retrieve email statistics");
            observe("stats", "error", "/api/preference/stats", start);
            envelope(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiEnvelope::<EmailStats>::failure(MSG_STATS_FAILED, now),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{app_router, test_support::*};
    use axum::{body::Body, http::Request};
    use serde_json::json;

    #[tokio::test]
    async fn save_load_delete_round_trip() {
        let app = app_router(setup_state().await);

        let (status, response) = send(
            &app,
            json_request("POST", "/api/preference", json!({"email": "  Jane.Doe@Gmail.com "})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!(MSG_SAVED));
        assert_eq!(body["data"]["email"], json!("jane.doe@gmail.com"));
        assert_eq!(body["data"]["version"], json!("1.0"));
        assert_eq!(body["timestamp"], json!("2024-06-01T09:30:00Z"));

        let (status, response) = send(&app, empty_request("GET", "/api/preference")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], json!(MSG_LOADED));
        assert_eq!(body["data"]["email"], json!("jane.doe@gmail.com"));
        assert_eq!(body["data"]["lastUpdated"], json!("2024-06-01T09:30:00Z"));

        let (status, response) = send(&app, empty_request("DELETE", "/api/preference")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!(MSG_DELETED));
        assert!(body.get("data").is_none());

        let (status, response) = send(&app, empty_request("GET", "/api/preference")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["message"], json!(MSG_NOT_FOUND));
    }

    #[tokio::test]
    async fn save_rejects_invalid_emails_with_envelope() {
        let app = app_router(setup_state().await);
        let cases = [
            (json!({"email": 12}), "Email must be a non-empty string"),
            (json!({}), "Email must be a non-empty string"),
            (json!({"email": "   "}), "Email cannot be empty"),
            (json!({"email": "not-an-email"}), "Invalid email format"),
            (
                json!({"email": format!("{}@example.com", "a".repeat(250))}),
                "Email is too long",
            ),
        ];

        for (payload, message) in cases {
            let (status, response) =
                send(&app, json_request("POST", "/api/preference", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            assert_eq!(body["success"], json!(false));
            assert_eq!(body["message"], json!(message));
        }

        let (status, _) = send(&app, empty_request("GET", "/api/preference")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_body_returns_problem_json() {
        let app = app_router(setup_state().await);
        let request = Request::builder()
            .method("POST")
            .uri("/api/preference")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, response) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/problem+json"
        );
        let body = json_body(response).await;
        assert_eq!(body["type"], json!("invalid_json"));
    }

    #[tokio::test]
    async fn delete_without_record_still_succeeds() {
        let app = app_router(setup_state().await);
        let (status, response) = send(&app, empty_request("DELETE", "/api/preference")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(response).await["success"], json!(true));
    }

    #[tokio::test]
    async fn stats_aggregate_stored_records_by_domain() {
        let state = setup_state().await;
        let repo = state.storage().preferences();
        let now = state.now();
        repo.save("a", "ann@gmail.com", now).await.expect("save a");
        repo.save("b", "bob@gmail.com", now).await.expect("save b");
        repo.save("c", "cat@proton.me", now).await.expect("save c");
        let app = app_router(state);

        let (status, response) = send(&app, empty_request("GET", "/api/preference/stats")).await;
        assert_eq!(status, StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["message"], json!(MSG_STATS));
        assert_eq!(body["data"]["totalEmails"], json!(3));
        assert_eq!(
            body["data"]["domains"],
            json!({"gmail.com": 2, "proton.me": 1})
        );
        assert_eq!(body["data"]["lastUpdated"], json!("2024-06-01T09:30:00Z"));
    }
}
