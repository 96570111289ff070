//! Plugin protocol types
//!
//! Plugins communicate via JSON messages over stdin/stdout.
//! Each plugin must support the `--manifest` flag to describe its shape.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::Primitive;

/// Plugin manifest describing the shape it draws
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Shape name shown in the toolbar (e.g., "Star")
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Toolbar icon; defaults to the first letter of the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl PluginManifest {
    pub fn icon_or_initial(&self) -> String {
        self.icon
            .clone()
            .filter(|icon| !icon.is_empty())
            .or_else(|| self.name.chars().next().map(String::from))
            .unwrap_or_else(|| "?".to_string())
    }
}

/// A message sent to a plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginRequest {
    /// The operation to perform
    pub operation: String,

    /// Operation-specific parameters
    pub params: serde_json::Value,
}

impl PluginRequest {
    fn new(operation: impl Into<String>, params: impl Into<serde_json::Value>) -> Self {
        Self {
            operation: operation.into(),
            params: params.into(),
        }
    }

    /// Asks for the shape outline inside a `size` x `size` box around (0,0)
    pub fn draw(size: i32) -> Self {
        Self::new("draw", serde_json::json!({ "size": size }))
    }
}

/// A response from a plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginResponse {
    /// Whether the operation succeeded
    pub success: bool,

    /// Result data (if success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message (if failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PluginResponse {
    /// Decodes the primitives of a successful draw reply
    pub fn into_outline(self) -> Result<Vec<Primitive>> {
        if !self.success {
            let message = self.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(anyhow!("Plugin reported failure: {}", message));
        }

        let data = self
            .data
            .ok_or_else(|| anyhow!("Plugin reply has no data"))?;
        let reply: DrawReply =
            serde_json::from_value(data).context("Failed to parse draw reply")?;
        Ok(reply.primitives)
    }
}

/// Payload of a successful draw reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawReply {
    /// Primitives relative to the anchor (0,0)
    pub primitives: Vec<Primitive>,
}
