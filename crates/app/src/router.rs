use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use email_memory_core::EmailAdvisor;
use email_memory_storage::{Database, DEFAULT_DOCUMENT_ID};
use metrics_exporter_prometheus::PrometheusHandle;

use crate::{advice, preference, telemetry};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    advisor: EmailAdvisor,
    document_id: Arc<str>,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database, advisor: EmailAdvisor) -> Self {
        Self {
            metrics,
            storage,
            advisor,
            document_id: Arc::from(DEFAULT_DOCUMENT_ID),
            clock: Arc::new(Utc::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn advisor(&self) -> &EmailAdvisor {
        &self.advisor
    }

    /// Document the single-user endpoints read and write.
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route(
            "/api/preference",
            post(preference::save)
                .get(preference::load)
                .delete(preference::delete),
        )
        .route("/api/preference/stats", get(preference::stats))
        .route("/api/validate", post(advice::validate))
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        Body::from(body),
    )
        .into_response()
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn healthz_returns_ok() {
        let app = app_router(setup_state().await);
        let (status, _) = send(&app, empty_request("GET", "/healthz")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_exports_build_info() {
        let app = app_router(setup_state().await);
        let (status, response) = send(&app, empty_request("GET", "/metrics")).await;
        assert_eq!(status, StatusCode::OK);

        let collected = response
            .into_body()
            .collect()
            .await
            .expect("body should read");
        let body = String::from_utf8(collected.to_bytes().to_vec()).expect("utf-8");
        assert!(body.contains("app_build_info"));
        assert!(body.contains("app_uptime_seconds"));
    }

    #[tokio::test]
    async fn unknown_method_is_rejected() {
        let app = app_router(setup_state().await);
        let (status, _) = send(&app, empty_request("PUT", "/api/preference")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }
}
