use crate::properties::Page;
use serde_json::{Value, json};

/// Equality filter over the store's typed properties. Only the four property
/// types the registration schema uses are supported; conjunctions nest under
/// `And`.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    RichText { property: String, equals: String },
    Select { property: String, equals: String },
    Email { property: String, equals: String },
    Date { property: String, equals: String },
    And(Vec<Filter>),
}

impl Filter {
    pub fn rich_text(property: &str, equals: &str) -> Self {
        Filter::RichText {
            property: property.into(),
            equals: equals.into(),
        }
    }

    pub fn select(property: &str, equals: &str) -> Self {
        Filter::Select {
            property: property.into(),
            equals: equals.into(),
        }
    }

    pub fn email(property: &str, equals: &str) -> Self {
        Filter::Email {
            property: property.into(),
            equals: equals.into(),
        }
    }

    pub fn date(property: &str, equals: &str) -> Self {
        Filter::Date {
            property: property.into(),
            equals: equals.into(),
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Wire shape of the filter as the store's query endpoint expects it.
    pub fn to_json(&self) -> Value {
        match self {
            Filter::RichText { property, equals } => {
                json!({ "property": property, "rich_text": { "equals": equals } })
            }
            Filter::Select { property, equals } => {
                json!({ "property": property, "select": { "equals": equals } })
            }
            Filter::Email { property, equals } => {
                json!({ "property": property, "email": { "equals": equals } })
            }
            Filter::Date { property, equals } => {
                json!({ "property": property, "date": { "equals": equals } })
            }
            Filter::And(filters) => {
                json!({ "and": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
        }
    }

    /// Evaluates the filter against a page. This mirrors the store's own
    /// equality semantics and backs the in-memory test store.
    pub fn matches(&self, page: &Page) -> bool {
        match self {
            Filter::RichText { property, equals } => {
                page.plain_text(property).as_deref() == Some(equals.as_str())
            }
            Filter::Select { property, equals } => page.select(property) == Some(equals.as_str()),
            Filter::Email { property, equals } => page.email(property) == Some(equals.as_str()),
            Filter::Date { property, equals } => page.date(property) == Some(equals.as_str()),
            Filter::And(filters) => filters.iter().all(|filter| filter.matches(page)),
        }
    }
}
