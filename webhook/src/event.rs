//! Wire types for inbound payment-processor events.

use serde::Deserialize;

/// The only event kind this system acts on.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

pub const PAYMENT_STATUS_PAID: &str = "paid";

/// Event envelope as delivered by the payment processor.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EventData {
    pub object: CheckoutSession,
}

/// The processor's record of a checkout. Fields beyond these are ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub payment_status: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    /// Paid amount in minor currency units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    /// Unix timestamp of the checkout.
    #[serde(default)]
    pub created: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

impl CheckoutSession {
    /// Customer email, preferring the details block over the top-level field.
    /// Blank candidates fall through.
    pub fn email(&self) -> Option<&str> {
        fn present(email: Option<&str>) -> Option<&str> {
            email.filter(|email| !email.trim().is_empty())
        }
        present(
            self.customer_details
                .as_ref()
                .and_then(|details| details.email.as_deref()),
        )
        .or_else(|| present(self.customer_email.as_deref()))
    }
}
