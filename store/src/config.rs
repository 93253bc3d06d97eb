use serde::Deserialize;

/// Protocol version sent with every store request.
pub const PROTOCOL_VERSION: &str = "2022-06-28";

const DEFAULT_BASE_URL: &str = "https://api.notion.com";

/// Connection parameters for the document store. Constructed explicitly and
/// handed to the client; nothing reads ambient environment state.
#[derive(Clone, Debug, Deserialize)]
pub struct StoreConfig {
    /// Bearer credential for the store's HTTP API.
    pub token: String,
    /// Identifier of the database holding registration records.
    pub database_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}
