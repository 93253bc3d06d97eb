//! HTTP surface for registrations and availability checks.

use crate::availability::{self, DependencyFailure};
use crate::normalize::normalize;
use crate::record::Registration;
use crate::upsert::{UpsertOutcome, upsert_registration};
use crate::validate::validate;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use axum::http::{HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use store::DocumentStore;

#[derive(Clone)]
pub struct RegistrationState {
    pub store: Arc<dyn DocumentStore>,
    pub capacity: u32,
}

pub fn router(state: RegistrationState) -> Router {
    Router::new()
        .route(
            "/register",
            get(handle).post(handle).options(preflight),
        )
        .with_state(state)
}

/// Browser callers come from arbitrary origins; every response on this
/// surface carries permissive CORS headers.
fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
    ]
}

async fn preflight() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, cors_headers())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AvailabilityResponse {
    ok: bool,
    cohort: String,
    start_date: Option<String>,
    is_available: bool,
    spots_left: u32,
    paid_count: u32,
}

#[derive(Serialize)]
struct ValidationFailure {
    ok: bool,
    errors: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CapacityExhausted {
    ok: bool,
    error: String,
    cohort: String,
    start_date: String,
    spots_left: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    ok: bool,
    page_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    created: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    updated: Option<bool>,
}

#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

async fn handle(
    State(state): State<RegistrationState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    if let Some(cohort) = query.get("check-avail") {
        return check_availability(&state, cohort, query.get("check-date").map(String::as_str))
            .await;
    }
    register(&state, &method, &query, &body).await
}

/// Read path. A gate failure here is fatal: there is no registration to
/// protect, so the error propagates as a 500.
async fn check_availability(
    state: &RegistrationState,
    cohort: &str,
    start_date: Option<&str>,
) -> Response {
    match availability::check_with_policy(
        state.store.as_ref(),
        cohort,
        start_date,
        state.capacity,
        DependencyFailure::Propagate,
    )
    .await
    {
        Ok(Some(availability)) => (
            StatusCode::OK,
            cors_headers(),
            Json(AvailabilityResponse {
                ok: true,
                cohort: cohort.to_string(),
                start_date: start_date.map(String::from),
                is_available: availability.is_available,
                spots_left: availability.spots_left,
                paid_count: availability.paid_count,
            }),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, cohort, "availability check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                cors_headers(),
                Json(ErrorResponse {
                    ok: false,
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
        // Propagate never yields None
        Ok(None) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            cors_headers(),
            Json(ErrorResponse {
                ok: false,
                error: "availability check failed".into(),
            }),
        )
            .into_response(),
    }
}

/// Write path: normalize, validate, gate (fail-open), upsert.
async fn register(
    state: &RegistrationState,
    method: &Method,
    query: &HashMap<String, String>,
    body: &[u8],
) -> Response {
    let fields = normalize(method, query, body);

    let errors = validate(&fields);
    if !errors.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            cors_headers(),
            Json(ValidationFailure { ok: false, errors }),
        )
            .into_response();
    }

    let registration = Registration::from_fields(&fields);

    // Fail-open: a degraded store must not block the registration attempt.
    let verdict = availability::check_with_policy(
        state.store.as_ref(),
        &registration.cohort,
        Some(&registration.start_date),
        state.capacity,
        DependencyFailure::Proceed,
    )
    .await
    .unwrap_or(None);

    if let Some(availability) = verdict
        && !availability.is_available
    {
        metrics::counter!("registration.capacity_rejected").increment(1);
        return (
            StatusCode::CONFLICT,
            cors_headers(),
            Json(CapacityExhausted {
                ok: false,
                error: "no spots left for this cohort and start date".into(),
                cohort: registration.cohort.clone(),
                start_date: registration.start_date.clone(),
                spots_left: 0,
            }),
        )
            .into_response();
    }

    match upsert_registration(state.store.as_ref(), &registration).await {
        Ok(UpsertOutcome::Created { page_id }) => {
            metrics::counter!("registration.created").increment(1);
            (
                StatusCode::OK,
                cors_headers(),
                Json(UpsertResponse {
                    ok: true,
                    page_id,
                    created: Some(true),
                    updated: None,
                }),
            )
                .into_response()
        }
        Ok(UpsertOutcome::Updated { page_id }) => {
            metrics::counter!("registration.updated").increment(1);
            (
                StatusCode::OK,
                cors_headers(),
                Json(UpsertResponse {
                    ok: true,
                    page_id,
                    created: None,
                    updated: Some(true),
                }),
            )
                .into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, email = %registration.email, "registration write failed");
            (
                StatusCode::BAD_GATEWAY,
                cors_headers(),
                Json(ErrorResponse {
                    ok: false,
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PROP_COHORT, PROP_GOAL, PROP_START_DATE, PROP_STATUS, Status};
    use serde_json::{Value, json};
    use store::Properties;
    use store::testutils::{FailingStore, MemoryStore, QueryFailStore};

    async fn spawn_app(store: Arc<dyn DocumentStore>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(RegistrationState { store, capacity: 10 });
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn ana_body() -> Value {
        json!({
            "name": "Ana",
            "email": "ana@x.com",
            "start_date": "2024-03-01",
            "cohort": "spring",
            "goal": "learn basics",
        })
    }

    async fn seed_paid(store: &MemoryStore, cohort: &str, date: &str, count: usize) {
        for _ in 0..count {
            store
                .seed(
                    Properties::new()
                        .rich_text(PROP_COHORT, cohort)
                        .select(PROP_STATUS, Status::Paid.as_str())
                        .date(PROP_START_DATE, date),
                )
                .await;
        }
    }

    #[tokio::test]
    async fn preflight_returns_permissive_cors() {
        let base = spawn_app(Arc::new(MemoryStore::new())).await;
        let client = reqwest::Client::new();

        let response = client
            .request(reqwest::Method::OPTIONS, format!("{base}/register"))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 204);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .unwrap(),
            "*"
        );
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-methods")
                .unwrap(),
            "GET, POST, OPTIONS"
        );
    }

    #[tokio::test]
    async fn invalid_input_reports_every_violation() {
        let base = spawn_app(Arc::new(MemoryStore::new())).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/register"))
            .json(&json!({ "email": "nope", "start_date": "2024-03-01" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 400);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["errors"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn registering_twice_upserts() {
        let store = Arc::new(MemoryStore::new());
        let base = spawn_app(store.clone()).await;
        let client = reqwest::Client::new();

        let first: Value = client
            .post(format!("{base}/register"))
            .json(&ana_body())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(first["ok"], true);
        assert_eq!(first["created"], true);
        assert!(first["pageId"].as_str().is_some());

        let mut second_body = ana_body();
        second_body["goal"] = json!("ship a project");
        let second: Value = client
            .post(format!("{base}/register"))
            .json(&second_body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(second["updated"], true);

        let pages = store.pages().await;
        assert_eq!(pages.len(), 1);
        assert_eq!(
            pages[0].plain_text(PROP_GOAL).as_deref(),
            Some("ship a project")
        );
    }

    #[tokio::test]
    async fn full_cohort_is_rejected_with_409() {
        let store = MemoryStore::new();
        seed_paid(&store, "spring", "2024-03-01", 10).await;
        let base = spawn_app(Arc::new(store)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/register"))
            .json(&ana_body())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 409);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["ok"], false);
        assert_eq!(body["spotsLeft"], 0);
        assert_eq!(body["cohort"], "spring");
    }

    #[tokio::test]
    async fn check_avail_reads_capacity() {
        let store = MemoryStore::new();
        seed_paid(&store, "X", "2024-01-01", 3).await;
        let base = spawn_app(Arc::new(store)).await;

        let body: Value = reqwest::get(format!(
            "{base}/register?check-avail=X&check-date=2024-01-01"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

        assert_eq!(body["ok"], true);
        assert_eq!(body["cohort"], "X");
        assert_eq!(body["startDate"], "2024-01-01");
        assert_eq!(body["isAvailable"], true);
        assert_eq!(body["spotsLeft"], 7);
        assert_eq!(body["paidCount"], 3);
    }

    #[tokio::test]
    async fn check_avail_at_cap_reports_unavailable() {
        let store = MemoryStore::new();
        seed_paid(&store, "X", "2024-01-01", 10).await;
        let base = spawn_app(Arc::new(store)).await;

        let body: Value = reqwest::get(format!(
            "{base}/register?check-avail=X&check-date=2024-01-01"
        ))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

        assert_eq!(body["isAvailable"], false);
        assert_eq!(body["spotsLeft"], 0);
    }

    #[tokio::test]
    async fn check_avail_propagates_store_failure() {
        let base = spawn_app(Arc::new(FailingStore)).await;

        let response = reqwest::get(format!("{base}/register?check-avail=X"))
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn registration_proceeds_when_checks_fail() {
        let store = QueryFailStore::default();
        let inner = store.inner.clone();
        let base = spawn_app(Arc::new(store)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/register"))
            .json(&ana_body())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["created"], true);
        assert_eq!(inner.pages().await.len(), 1);
    }

    #[tokio::test]
    async fn store_write_failure_yields_502() {
        let base = spawn_app(Arc::new(FailingStore)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/register"))
            .json(&ana_body())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 502);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["ok"], false);
    }

    #[tokio::test]
    async fn query_parameters_can_register_too() {
        let store = Arc::new(MemoryStore::new());
        let base = spawn_app(store.clone()).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!(
                "{base}/register?name=Ana&email=ana@x.com&start_date=2024-03-01&cohort=spring"
            ))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(store.pages().await.len(), 1);
    }
}
