//! Applies completed-checkout events to registration records.

use crate::event::{CHECKOUT_COMPLETED, PAYMENT_STATUS_PAID, PaymentEvent};
use chrono::{DateTime, Utc};
use registration::record::{
    PROP_AMOUNT_PAID, PROP_EMAIL, PROP_PAYMENT_DATE, PROP_SESSION_ID, PROP_STATUS,
    PROP_STRIPE_LINK, Status,
};
use serde::Serialize;
use store::{DocumentStore, Filter, Properties, StoreError};

const DASHBOARD_URL: &str = "https://dashboard.stripe.com/payments";

/// One registration record marked paid by an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaidPage {
    pub page_id: String,
    pub stripe_link: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum WebhookOutcome {
    /// Event kind or payment status this processor does not act on.
    Ignored { reason: &'static str },
    /// Paid event whose email matches no registration. Not an error; the
    /// payment may precede the registration.
    NoMatch { email: String },
    Updated {
        email: String,
        session_id: String,
        stripe_link: String,
        amount_paid: f64,
        pages: Vec<PaidPage>,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum WebhookError {
    #[error("no customer email in event")]
    MissingEmail,
    #[error("store update failed: {0}")]
    Store(#[from] StoreError),
}

/// Processes one event. Every record matching the customer email — across
/// cohorts and dates, deliberately unscoped — transitions to `paid` and gets
/// the payment metadata attached. Re-applying the same event rewrites the
/// same fields, so webhook retries are harmless.
pub async fn process_event(
    store: &dyn DocumentStore,
    event: &PaymentEvent,
) -> Result<WebhookOutcome, WebhookError> {
    if event.kind != CHECKOUT_COMPLETED {
        tracing::debug!(kind = %event.kind, "ignoring event");
        return Ok(WebhookOutcome::Ignored {
            reason: "unhandled event type",
        });
    }

    let session = &event.data.object;
    if session.payment_status != PAYMENT_STATUS_PAID {
        tracing::debug!(
            session_id = %session.id,
            payment_status = %session.payment_status,
            "ignoring session that is not paid"
        );
        return Ok(WebhookOutcome::Ignored {
            reason: "payment not completed",
        });
    }

    let email = session.email().ok_or(WebhookError::MissingEmail)?.to_string();

    let matches = store.query(Filter::email(PROP_EMAIL, &email)).await?;
    if matches.is_empty() {
        tracing::info!(email = %email, "paid event matched no registration");
        return Ok(WebhookOutcome::NoMatch { email });
    }

    let stripe_link = format!("{DASHBOARD_URL}/{}", session.id);
    let amount_paid = session.amount_total.unwrap_or(0) as f64 / 100.0;
    let payment_date = payment_date(session.created);

    let mut pages = Vec::with_capacity(matches.len());
    for page in matches {
        let patch = Properties::new()
            .select(PROP_STATUS, Status::Paid.as_str())
            .rich_text(PROP_SESSION_ID, &session.id)
            .url(PROP_STRIPE_LINK, &stripe_link)
            .number(PROP_AMOUNT_PAID, amount_paid)
            .date(PROP_PAYMENT_DATE, &payment_date);
        let updated = store.update_page(&page.id, patch).await?;
        pages.push(PaidPage {
            page_id: updated.id,
            stripe_link: stripe_link.clone(),
        });
    }

    tracing::info!(
        email = %email,
        count = pages.len(),
        amount = amount_paid,
        currency = session.currency.as_deref().unwrap_or(""),
        "marked registrations paid"
    );

    Ok(WebhookOutcome::Updated {
        email,
        session_id: session.id.clone(),
        stripe_link,
        amount_paid,
        pages,
    })
}

fn payment_date(created: Option<i64>) -> String {
    created
        .and_then(|timestamp| DateTime::<Utc>::from_timestamp(timestamp, 0))
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d")
        .to_string()
}
