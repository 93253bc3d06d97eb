//! The registration record and its mapping onto the store's typed properties.

use std::collections::HashMap;
use store::Properties;

pub const PROP_NAME: &str = "Name";
pub const PROP_EMAIL: &str = "Email";
pub const PROP_START_DATE: &str = "Start Date";
pub const PROP_COHORT: &str = "Cohort";
pub const PROP_GOAL: &str = "Goal";
pub const PROP_STATUS: &str = "Status";
pub const PROP_SESSION_ID: &str = "Stripe Session ID";
pub const PROP_STRIPE_LINK: &str = "Stripe Link";
pub const PROP_AMOUNT_PAID: &str = "Amount Paid";
pub const PROP_PAYMENT_DATE: &str = "Payment Date";

/// Default for optional free-text fields.
pub const UNKNOWN: &str = "unknown";

/// Lifecycle of a record. The only transition is registered -> paid, applied
/// by the payment webhook; nothing moves a record back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Registered,
    Paid,
}

impl Status {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Status::Registered => "registered",
            Status::Paid => "paid",
        }
    }
}

/// Input accepted by the registration write path, already normalized and
/// validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub start_date: String,
    pub cohort: String,
    pub goal: String,
}

impl Registration {
    /// Builds a registration from normalized fields. Values are trimmed;
    /// cohort and goal fall back to "unknown" when absent. `expectation` is
    /// accepted as an alias for `goal`.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            fields
                .get(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Registration {
            name: get("name").unwrap_or_default(),
            email: get("email").unwrap_or_default(),
            start_date: get("start_date").unwrap_or_default(),
            cohort: get("cohort").unwrap_or_else(|| UNKNOWN.into()),
            goal: get("goal")
                .or_else(|| get("expectation"))
                .unwrap_or_else(|| UNKNOWN.into()),
        }
    }

    /// Full property set for a newly created record.
    pub fn to_properties(&self) -> Properties {
        Properties::new()
            .title(PROP_NAME, &self.name)
            .email(PROP_EMAIL, &self.email)
            .date(PROP_START_DATE, &self.start_date)
            .rich_text(PROP_COHORT, &self.cohort)
            .rich_text(PROP_GOAL, &self.goal)
            .select(PROP_STATUS, Status::Registered.as_str())
    }
}
