pub mod client;
pub mod config;
pub mod filter;
pub mod properties;
pub mod testutils;

pub use client::{DocumentStore, NotionStore, StoreError};
pub use config::StoreConfig;
pub use filter::Filter;
pub use properties::{Page, Properties};
