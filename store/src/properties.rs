use serde::Deserialize;
use serde_json::{Map, Value, json};

/// Builder for the typed property payload of a create or patch call.
///
/// The store types every column; each helper wraps a plain value in the JSON
/// shape the corresponding property type expects.
#[derive(Clone, Debug, Default)]
pub struct Properties(Map<String, Value>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, name: &str, value: &str) -> Self {
        self.0.insert(
            name.into(),
            json!({ "title": [{ "text": { "content": value } }] }),
        );
        self
    }

    pub fn rich_text(mut self, name: &str, value: &str) -> Self {
        self.0.insert(
            name.into(),
            json!({ "rich_text": [{ "text": { "content": value } }] }),
        );
        self
    }

    pub fn email(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.into(), json!({ "email": value }));
        self
    }

    pub fn select(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.into(), json!({ "select": { "name": value } }));
        self
    }

    pub fn date(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.into(), json!({ "date": { "start": value } }));
        self
    }

    pub fn number(mut self, name: &str, value: f64) -> Self {
        self.0.insert(name.into(), json!({ "number": value }));
        self
    }

    pub fn url(mut self, name: &str, value: &str) -> Self {
        self.0.insert(name.into(), json!({ "url": value }));
        self
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// A stored page: its store-assigned id plus the raw typed property map.
#[derive(Clone, Debug, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Page {
    /// Concatenated plain text of a title or rich_text property.
    pub fn plain_text(&self, name: &str) -> Option<String> {
        let property = self.properties.get(name)?;
        let parts = property
            .get("title")
            .or_else(|| property.get("rich_text"))?
            .as_array()?;
        Some(
            parts
                .iter()
                .filter_map(|part| {
                    part.get("text")
                        .and_then(|text| text.get("content"))
                        .and_then(Value::as_str)
                })
                .collect(),
        )
    }

    pub fn email(&self, name: &str) -> Option<&str> {
        self.properties.get(name)?.get("email")?.as_str()
    }

    pub fn select(&self, name: &str) -> Option<&str> {
        self.properties.get(name)?.get("select")?.get("name")?.as_str()
    }

    pub fn date(&self, name: &str) -> Option<&str> {
        self.properties.get(name)?.get("date")?.get("start")?.as_str()
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.properties.get(name)?.get("number")?.as_f64()
    }

    pub fn link(&self, name: &str) -> Option<&str> {
        self.properties.get(name)?.get("url")?.as_str()
    }
}
