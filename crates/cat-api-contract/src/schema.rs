// crates/cat-api-contract/src/schema.rs
// ============================================================================
// Module: Response Schemas
// Description: JSON Schemas for image API response bodies.
// Purpose: Validate response shape independently of partial matching.
// Dependencies: jsonschema, serde_json
// ============================================================================

//! ## Overview
//! Schemas are Draft 2020-12 documents compiled once per suite run and shared
//! through [`std::sync::Arc`]. Validation reports every violation rather than
//! the first, so a failed listing names all offending elements.

use std::sync::Arc;

use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use serde_json::json;

/// Schema for a single image resource.
#[must_use]
pub fn image_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://cat-api-contract.local/schemas/image.json",
        "title": "Image",
        "type": "object",
        "properties": {
            "id": { "type": "string" },
            "url": { "type": "string" }
        },
        "required": ["id", "url"]
    })
}

/// Schema for the image listing response.
#[must_use]
pub fn image_list_schema() -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://cat-api-contract.local/schemas/image-list.json",
        "title": "ImageList",
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "url": { "type": "string" }
            },
            "required": ["id", "url"]
        }
    })
}

/// Compiled schema shared between expectations.
#[derive(Clone)]
pub struct CompiledSchema {
    /// Schema title used in failure messages.
    title: String,
    /// Compiled validator.
    validator: Arc<Validator>,
}

impl CompiledSchema {
    /// Compiles `schema` against Draft 2020-12.
    ///
    /// # Errors
    ///
    /// Returns the compiler message when the schema itself is invalid.
    pub fn compile(schema: &Value) -> Result<Self, String> {
        let title = schema.get("title").and_then(Value::as_str).unwrap_or("schema").to_string();
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| format!("{title}: {err}"))?;
        Ok(Self {
            title,
            validator: Arc::new(validator),
        })
    }

    /// Returns the schema title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Validates `instance`, returning every violation message on failure.
    ///
    /// # Errors
    ///
    /// Returns the list of violation messages.
    pub fn validate(&self, instance: &Value) -> Result<(), Vec<String>> {
        let messages: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect();
        if messages.is_empty() { Ok(()) } else { Err(messages) }
    }
}

impl std::fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledSchema").field("title", &self.title).finish_non_exhaustive()
    }
}
