//! Indexing unit: one natural-language document per device.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use homesight_core::{Error, Result};
use homesight_devices::{UnifiedDevice, UniversalDeviceId};

/// Structured metadata stored alongside the embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    pub capabilities: Vec<String>,
    pub platform: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub tags: Vec<String>,
}

/// One device rendered as a searchable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    pub device_id: UniversalDeviceId,
    /// Natural-language description fed to the embedder.
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl MetadataDocument {
    /// Render a device into its document form.
    ///
    /// Content shape: `"<label-or-name>[, located in <room>][,
    /// <capability-verbs>][, <manufacturer> <model>][, offline]"`.
    pub fn for_device(device: &UnifiedDevice) -> Self {
        let mut content = device.display_name().to_string();

        if let Some(room) = &device.room {
            content.push_str(&format!(", located in {}", room));
        }

        let verbs: Vec<&str> = device
            .capabilities
            .iter()
            .filter_map(|c| c.verb())
            .collect();
        if !verbs.is_empty() {
            content.push_str(", ");
            content.push_str(&verbs.join(", "));
        }

        match (&device.manufacturer, &device.model) {
            (Some(manufacturer), Some(model)) => {
                content.push_str(&format!(", {} {}", manufacturer, model));
            }
            (Some(manufacturer), None) => {
                content.push_str(&format!(", {}", manufacturer));
            }
            (None, Some(model)) => {
                content.push_str(&format!(", {}", model));
            }
            (None, None) => {}
        }

        if !device.online {
            content.push_str(", offline");
        }

        let mut tags: Vec<String> = device.capabilities.iter().map(|c| c.to_string()).collect();
        if device.capabilities.iter().any(|c| c.is_sensor()) {
            tags.push("sensor".to_string());
        }
        if !device.online {
            tags.push("offline".to_string());
        }

        Self {
            device_id: device.id.clone(),
            content,
            metadata: DocumentMetadata {
                name: device.name.clone(),
                label: device.label.clone(),
                room: device.room.clone(),
                capabilities: device.capabilities.iter().map(|c| c.to_string()).collect(),
                platform: device.platform.clone(),
                online: device.online,
                manufacturer: device.manufacturer.clone(),
                model: device.model.clone(),
                tags,
            },
        }
    }

    /// Flat metadata map for the vector store, including the content text
    /// so sync can detect document changes without re-embedding.
    pub fn flat_metadata(&self) -> Result<Map<String, Value>> {
        let value = serde_json::to_value(&self.metadata)?;
        let mut flat = flatten_metadata(&value)?;
        flat.insert("content".to_string(), Value::String(self.content.clone()));
        Ok(flat)
    }
}

/// Flatten a metadata object for the vector store, which only accepts
/// string / number / boolean / null values.
///
/// Nested objects flatten to dotted keys; arrays of scalars join to a
/// comma-separated string; arrays containing structured values are
/// rejected with `MetadataInvalid`.
pub fn flatten_metadata(value: &Value) -> Result<Map<String, Value>> {
    let object = value.as_object().ok_or_else(|| {
        Error::MetadataInvalid("metadata must be a JSON object".to_string())
    })?;

    let mut flat = Map::new();
    flatten_into(object, "", &mut flat)?;
    Ok(flat)
}

fn flatten_into(object: &Map<String, Value>, prefix: &str, out: &mut Map<String, Value>) -> Result<()> {
    for (key, value) in object {
        let flat_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) => flatten_into(nested, &flat_key, out)?,
            Value::Array(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => parts.push(s.clone()),
                        Value::Number(n) => parts.push(n.to_string()),
                        Value::Bool(b) => parts.push(b.to_string()),
                        _ => {
                            return Err(Error::MetadataInvalid(format!(
                                "array under {:?} contains structured values",
                                flat_key
                            )))
                        }
                    }
                }
                out.insert(flat_key, Value::String(parts.join(",")));
            }
            scalar => {
                out.insert(flat_key, scalar.clone());
            }
        }
    }
    Ok(())
}
