//! Tool definitions and the JSON Schema builder used to declare parameters.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// What the model sees for one tool on every turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

/// A tool's parameter schema (always a JSON Schema `object`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentToolParameters {
    pub schema: Value,
}

impl AgentToolParameters {
    /// A tool that takes no arguments.
    pub fn empty() -> Self {
        Self::object().build()
    }

    pub fn object() -> ParameterBuilder {
        ParameterBuilder::default()
    }
}

/// Accumulates properties in declaration order.
#[derive(Debug, Default)]
pub struct ParameterBuilder {
    properties: Map<String, Value>,
    required: Vec<String>,
}

impl ParameterBuilder {
    fn add(mut self, name: impl Into<String>, mut property: Value, description: impl Into<String>, required: bool) -> Self {
        let name = name.into();
        if let Some(obj) = property.as_object_mut() {
            obj.insert("description".into(), Value::String(description.into()));
        }
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, property);
        self
    }

    pub fn string(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.add(name, json!({ "type": "string" }), description, required)
    }

    pub fn integer(self, name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        self.add(name, json!({ "type": "integer" }), description, required)
    }

    /// An optional integer whose default is advertised in the schema.
    pub fn integer_with_default(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        default: i64,
    ) -> Self {
        self.add(
            name,
            json!({ "type": "integer", "default": default }),
            description,
            false,
        )
    }

    /// A string restricted to `values`.
    pub fn string_enum(
        self,
        name: impl Into<String>,
        description: impl Into<String>,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.add(
            name,
            json!({ "type": "string", "enum": values }),
            description,
            required,
        )
    }

    pub fn build(self) -> AgentToolParameters {
        AgentToolParameters {
            schema: json!({
                "type": "object",
                "properties": self.properties,
                "required": self.required,
            }),
        }
    }
}
