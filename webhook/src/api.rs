//! HTTP surface for the payment webhook.

use crate::event::PaymentEvent;
use crate::processor::{PaidPage, WebhookError, WebhookOutcome, process_event};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use store::DocumentStore;

#[derive(Clone)]
pub struct WebhookState {
    pub store: Arc<dyn DocumentStore>,
}

/// Only POST is routed; anything else gets the method router's 405 without
/// touching the store.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/stripe-webhook", post(handle))
        .with_state(state)
}

#[derive(Serialize)]
struct IgnoredResponse {
    ok: bool,
    ignored: bool,
    reason: &'static str,
}

#[derive(Serialize)]
struct NoMatchResponse {
    ok: bool,
    updated: usize,
    note: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatedResponse {
    ok: bool,
    updated: usize,
    email: String,
    stripe_session_id: String,
    stripe_link: String,
    amount_paid: f64,
    pages: Vec<PaidPage>,
}

#[derive(Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
}

async fn handle(State(state): State<WebhookState>, body: Bytes) -> Response {
    let event: PaymentEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(err) => {
            tracing::warn!(error = %err, "unparseable webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    ok: false,
                    error: "invalid event payload".into(),
                }),
            )
                .into_response();
        }
    };

    match process_event(state.store.as_ref(), &event).await {
        Ok(WebhookOutcome::Ignored { reason }) => {
            metrics::counter!("webhook.ignored").increment(1);
            (
                StatusCode::OK,
                Json(IgnoredResponse {
                    ok: true,
                    ignored: true,
                    reason,
                }),
            )
                .into_response()
        }
        Ok(WebhookOutcome::NoMatch { email }) => {
            metrics::counter!("webhook.no_match").increment(1);
            tracing::info!(email = %email, "no matching registration for payment");
            (
                StatusCode::OK,
                Json(NoMatchResponse {
                    ok: true,
                    updated: 0,
                    note: "no_matching_email",
                }),
            )
                .into_response()
        }
        Ok(WebhookOutcome::Updated {
            email,
            session_id,
            stripe_link,
            amount_paid,
            pages,
        }) => {
            metrics::counter!("webhook.updated").increment(pages.len() as u64);
            (
                StatusCode::OK,
                Json(UpdatedResponse {
                    ok: true,
                    updated: pages.len(),
                    email,
                    stripe_session_id: session_id,
                    stripe_link,
                    amount_paid,
                    pages,
                }),
            )
                .into_response()
        }
        Err(err @ WebhookError::MissingEmail) => (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                ok: false,
                error: err.to_string(),
            }),
        )
            .into_response(),
        Err(err @ WebhookError::Store(_)) => {
            tracing::error!(error = %err, "webhook processing failed");
            (
                StatusCode::BAD_GATEWAY,
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
    use registration::api::{RegistrationState, router as registration_router};
    use registration::record::{PROP_EMAIL, PROP_STATUS};
    use serde_json::{Value, json};
    use store::testutils::{FailingStore, MemoryStore};

    async fn spawn_app(store: Arc<dyn DocumentStore>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = registration_router(RegistrationState {
            store: store.clone(),
            capacity: 10,
        })
        .merge(router(WebhookState { store }));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn paid_event_body(email: &str) -> Value {
        json!({
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_test_1",
                    "payment_status": "paid",
                    "customer_email": email,
                    "amount_total": 19900,
                    "currency": "eur",
                    "created": 1709290000,
                }
            }
        })
    }

    #[tokio::test]
    async fn non_post_methods_are_rejected() {
        let base = spawn_app(Arc::new(MemoryStore::new())).await;
        let response = reqwest::get(format!("{base}/stripe-webhook")).await.unwrap();
        assert_eq!(response.status(), 405);
    }

    #[tokio::test]
    async fn unparseable_bodies_are_rejected() {
        let base = spawn_app(Arc::new(MemoryStore::new())).await;
        let client = reqwest::Client::new();

        for body in ["", "not json", r#"{"type": 7}"#] {
            let response = client
                .post(format!("{base}/stripe-webhook"))
                .body(body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), 400, "body {body:?}");
        }
    }

    #[tokio::test]
    async fn unhandled_kinds_are_acknowledged() {
        let base = spawn_app(Arc::new(MemoryStore::new())).await;
        let client = reqwest::Client::new();

        let mut body = paid_event_body("ana@x.com");
        body["type"] = json!("customer.created");
        let response: Value = client
            .post(format!("{base}/stripe-webhook"))
            .json(&body)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["ok"], true);
        assert_eq!(response["ignored"], true);
        assert!(response["reason"].as_str().is_some());
    }

    #[tokio::test]
    async fn unmatched_email_reports_no_matching_email() {
        let base = spawn_app(Arc::new(MemoryStore::new())).await;
        let client = reqwest::Client::new();

        let response: Value = client
            .post(format!("{base}/stripe-webhook"))
            .json(&paid_event_body("ghost@x.com"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(response["ok"], true);
        assert_eq!(response["updated"], 0);
        assert_eq!(response["note"], "no_matching_email");
    }

    #[tokio::test]
    async fn missing_email_is_a_400() {
        let base = spawn_app(Arc::new(MemoryStore::new())).await;
        let client = reqwest::Client::new();

        let mut body = paid_event_body("ana@x.com");
        body["data"]["object"]["customer_email"] = Value::Null;
        let response = client
            .post(format!("{base}/stripe-webhook"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn store_failure_is_a_502() {
        let base = spawn_app(Arc::new(FailingStore)).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{base}/stripe-webhook"))
            .json(&paid_event_body("ana@x.com"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 502);
    }

    #[tokio::test]
    async fn register_then_pay_end_to_end() {
        let store = Arc::new(MemoryStore::new());
        let base = spawn_app(store.clone()).await;
        let client = reqwest::Client::new();

        let registered: Value = client
            .post(format!("{base}/register"))
            .json(&json!({
                "name": "Ana",
                "email": "ana@x.com",
                "start_date": "2024-03-01",
                "cohort": "spring",
                "goal": "learn basics",
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(registered["created"], true);
        let page_id = registered["pageId"].as_str().unwrap().to_string();

        let paid: Value = client
            .post(format!("{base}/stripe-webhook"))
            .json(&paid_event_body("ana@x.com"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(paid["ok"], true);
        assert_eq!(paid["updated"], 1);
        assert_eq!(paid["email"], "ana@x.com");
        assert_eq!(paid["stripeSessionId"], "cs_test_1");
        assert_eq!(paid["amountPaid"], 199.0);
        assert_eq!(paid["pages"][0]["pageId"], page_id);

        let pages = store.pages().await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].email(PROP_EMAIL), Some("ana@x.com"));
        assert_eq!(pages[0].select(PROP_STATUS), Some("paid"));
    }
}
