//! # Provider Configuration
//!
//! A provider is configured with a JSON document naming the resources to
//! attach at startup:
//!
//! ```json
//! { "resources": [ { "type": "reference", "config": {}, "__id__": "..." } ] }
//! ```
//!
//! The older single-resource form `{ "resource": { ... } }` is also accepted.
//! In the list form a bad entry is skipped with a warning. The single form
//! has nothing to fall back on, so a bad entry there is an error.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::backend::Resource;
use crate::error::Error;
use crate::error::Result;
use crate::id::ResourceId;

/// One resource to attach at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    pub backend_type: String,
    pub config: Value,
    /// Id to reuse, if the entry carried one.
    pub id: Option<ResourceId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    /// The single-form entry.
    pub resource: Option<ResourceSpec>,
    /// Valid entries of the list form.
    pub resources: Vec<ResourceSpec>,
}

impl ProviderConfig {
    /// Parses a configuration document. Blank text means no resources.
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let document: Value = serde_json::from_str(text)?;
        let Value::Object(fields) = document else {
            return Err(Error::ConfigParse("configuration must be a JSON object".into()));
        };

        let resource = match fields.get("resource") {
            None => None,
            Some(entry) => Some(ResourceSpec::from_value(entry)?),
        };

        let resources = match fields.get("resources") {
            None => Vec::new(),
            Some(Value::Array(entries)) => entries
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| match ResourceSpec::from_value(entry) {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!(index, error = %e, "Skipping resource entry");
                        None
                    }
                })
                .collect(),
            Some(_) => return Err(Error::ConfigParse("\"resources\" must be an array".into())),
        };

        Ok(Self { resource, resources })
    }
}

impl ResourceSpec {
    fn from_value(entry: &Value) -> Result<Self> {
        let Value::Object(fields) = entry else {
            return Err(Error::ConfigParse("resource entry must be a JSON object".into()));
        };

        let backend_type = match fields.get("type") {
            Some(Value::String(name)) => name.clone(),
            Some(_) => return Err(Error::ConfigParse("\"type\" field in resource configuration is not a string".into())),
            None => return Err(Error::ConfigParse("\"type\" field not found in resource configuration".into())),
        };

        let config = fields
            .get("config")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));

        let id = match fields.get("__id__") {
            None => None,
            Some(Value::String(text)) => Some(
                text.parse::<ResourceId>()
                    .map_err(|e| Error::ConfigParse(e.to_string()))?,
            ),
            Some(_) => return Err(Error::ConfigParse("\"__id__\" must be a string".into())),
        };

        Ok(Self {
            backend_type,
            config,
            id,
        })
    }
}

/// Parses the JSON text a client sends with create and open. Blank is `{}`.
pub fn parse_backend_config(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(text)?)
}

#[derive(Serialize)]
struct RenderedConfig {
    resources: Vec<RenderedEntry>,
}

#[derive(Serialize)]
struct RenderedEntry {
    #[serde(rename = "type")]
    backend_type: String,
    config: Value,
    #[serde(rename = "__id__")]
    id: String,
}

/// Serializes live resources back into the list form.
pub fn render<'a>(resources: impl IntoIterator<Item = (ResourceId, &'a Resource)>) -> String {
    let mut entries: Vec<RenderedEntry> = resources
        .into_iter()
        .map(|(id, resource)| {
            let text = resource.backend().get_config();
            // Backends are expected to report JSON; keep anything else as a string.
            let config = serde_json::from_str(&text).unwrap_or(Value::String(text));
            RenderedEntry {
                backend_type: resource.backend_type().to_string(),
                config,
                id: id.to_string(),
            }
        })
        .collect();
    entries.sort_by(|a, b| a.id.cmp(&b.id));

    let rendered = RenderedConfig { resources: entries };
    serde_json::to_string(&rendered).unwrap_or_else(|_| "{\"resources\":[]}".to_string())
}
