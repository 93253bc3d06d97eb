//! Capacity gating: counts paid registrations for a cohort against the cap.

use crate::record::{PROP_COHORT, PROP_START_DATE, PROP_STATUS, Status};
use store::{DocumentStore, Filter, StoreError};

/// Paid seats per (cohort, start date) unless configured otherwise.
pub const DEFAULT_CAPACITY: u32 = 10;

/// What a call site does when a pre-flight store check fails. The
/// availability endpoint propagates; the registration write path proceeds so
/// a degraded store never blocks a legitimate registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DependencyFailure {
    Propagate,
    Proceed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Availability {
    pub is_available: bool,
    pub spots_left: u32,
    pub paid_count: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum AvailabilityError {
    #[error("availability check failed: {0}")]
    Store(#[from] StoreError),
}

/// Counts records with status `paid` for the cohort, narrowed to one start
/// date when given; omitting the date broadens the count across all dates.
pub async fn check_availability(
    store: &dyn DocumentStore,
    cohort: &str,
    start_date: Option<&str>,
    capacity: u32,
) -> Result<Availability, AvailabilityError> {
    let mut clauses = vec![
        Filter::rich_text(PROP_COHORT, cohort),
        Filter::select(PROP_STATUS, Status::Paid.as_str()),
    ];
    if let Some(date) = start_date {
        clauses.push(Filter::date(PROP_START_DATE, date));
    }

    let pages = store.query(Filter::and(clauses)).await?;
    let paid_count = pages.len() as u32;

    Ok(Availability {
        is_available: paid_count < capacity,
        spots_left: capacity.saturating_sub(paid_count),
        paid_count,
    })
}

/// Runs the gate under the caller's failure policy. Under `Proceed` a failed
/// check is logged and reported as `None`, leaving the caller without a
/// verdict rather than with an error.
pub async fn check_with_policy(
    store: &dyn DocumentStore,
    cohort: &str,
    start_date: Option<&str>,
    capacity: u32,
    on_failure: DependencyFailure,
) -> Result<Option<Availability>, AvailabilityError> {
    match check_availability(store, cohort, start_date, capacity).await {
        Ok(availability) => Ok(Some(availability)),
        Err(err) => match on_failure {
            DependencyFailure::Propagate => Err(err),
            DependencyFailure::Proceed => {
                tracing::warn!(error = %err, cohort, "availability check failed, proceeding");
                Ok(None)
            }
        },
    }
}
