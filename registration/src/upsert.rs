//! Create-or-update resolution for the (email, cohort, start_date) triple.

use crate::record::{PROP_COHORT, PROP_EMAIL, PROP_GOAL, PROP_START_DATE, Registration};
use store::{DocumentStore, Filter, Properties, StoreError};

/// Which write happened, with the store-assigned page id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created { page_id: String },
    Updated { page_id: String },
}

#[derive(thiserror::Error, Debug)]
pub enum UpsertError {
    #[error("store write failed: {0}")]
    Store(#[from] StoreError),
}

/// Creates or updates the record for the registration's identity triple.
///
/// An existing match only has its goal field refreshed. The existence check
/// is fail-open: if it errors, the write proceeds as a create. The store
/// offers no transaction here, so concurrent calls for the same triple can
/// both miss the check and create duplicates; that window is a documented
/// property of the design, not closed by this function.
pub async fn upsert_registration(
    store: &dyn DocumentStore,
    registration: &Registration,
) -> Result<UpsertOutcome, UpsertError> {
    match find_existing(store, registration).await {
        Ok(Some(page_id)) => {
            let patch = Properties::new().rich_text(PROP_GOAL, &registration.goal);
            let page = store.update_page(&page_id, patch).await?;
            tracing::info!(page_id = %page.id, email = %registration.email, "registration updated");
            Ok(UpsertOutcome::Updated { page_id: page.id })
        }
        Ok(None) => create(store, registration).await,
        Err(err) => {
            tracing::warn!(
                error = %err,
                email = %registration.email,
                "existence check failed, proceeding with create"
            );
            create(store, registration).await
        }
    }
}

async fn find_existing(
    store: &dyn DocumentStore,
    registration: &Registration,
) -> Result<Option<String>, StoreError> {
    let filter = Filter::and(vec![
        Filter::email(PROP_EMAIL, &registration.email),
        Filter::rich_text(PROP_COHORT, &registration.cohort),
        Filter::date(PROP_START_DATE, &registration.start_date),
    ]);
    Ok(store.query(filter).await?.into_iter().next().map(|page| page.id))
}

async fn create(
    store: &dyn DocumentStore,
    registration: &Registration,
) -> Result<UpsertOutcome, UpsertError> {
    let page = store.create_page(registration.to_properties()).await?;
    tracing::info!(page_id = %page.id, email = %registration.email, "registration created");
    Ok(UpsertOutcome::Created { page_id: page.id })
}
