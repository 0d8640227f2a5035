//! Tool descriptors and the manifest context produced once per request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single declared input property of a tool's JSON-schema `inputSchema`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PropertySchema {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub items: Option<Box<PropertySchema>>,
}

/// JSON-schema-shaped description of a tool's arguments.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InputSchema {
    #[serde(default)]
    pub properties: std::collections::BTreeMap<String, PropertySchema>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn requires(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.properties.get(name)?.type_.as_deref()
    }
}

/// `{ name, description, inputSchema }`. A descriptor is valid iff `name` is
/// non-empty; unnamed entries are dropped on merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: InputSchema,
}

impl ToolDescriptor {
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty()
    }
}

/// Merge manifest tools with `tools/list` tools: same-name entries from
/// `tools_list` override scalar fields and shallow-merge into `inputSchema`;
/// entries in `tools_list` whose name is absent from the manifest are
/// appended. Unnamed entries are dropped from both sides first.
pub fn merge_tool_descriptors(
    manifest_tools: &[ToolDescriptor],
    tools_list: &[ToolDescriptor],
) -> Vec<ToolDescriptor> {
    let mut by_name: std::collections::BTreeMap<String, ToolDescriptor> = std::collections::BTreeMap::new();

    for tool in manifest_tools.iter().filter(|t| t.is_valid()) {
        by_name.insert(tool.name.clone(), tool.clone());
    }

    for tool in tools_list.iter().filter(|t| t.is_valid()) {
        match by_name.get_mut(&tool.name) {
            Some(existing) => {
                if tool.description.is_some() {
                    existing.description = tool.description.clone();
                }
                for (k, v) in &tool.input_schema.properties {
                    existing.input_schema.properties.insert(k.clone(), v.clone());
                }
                for r in &tool.input_schema.required {
                    if !existing.input_schema.required.contains(r) {
                        existing.input_schema.required.push(r.clone());
                    }
                }
            }
            None => {
                by_name.insert(tool.name.clone(), tool.clone());
            }
        }
    }

    by_name.into_values().collect()
}

/// Result of the manifest GET + `tools/list` bootstrap for one request.
/// Produced once per request at planning time; immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestContext {
    pub ok: bool,
    pub status: u16,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub tools: Vec<ToolDescriptor>,
    #[serde(rename = "manifestAttempt")]
    pub manifest_attempt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Normalised result of a single `tools/call`. Exactly one of
/// `structured_content`, `content`, or `error` is meaningful.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CallResult {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_text: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl CallResult {
    pub fn is_success(&self) -> bool {
        self.status < 400 && self.error.is_none()
    }

    /// The value agents should reason about: structured content if present,
    /// else the joined content text, else the raw payload.
    pub fn effective_value(&self) -> Value {
        if let Some(v) = &self.structured_content {
            return v.clone();
        }
        if let Some(texts) = &self.content_text {
            return Value::String(texts.join("\n"));
        }
        self.raw.clone().unwrap_or(Value::Null)
    }
}
