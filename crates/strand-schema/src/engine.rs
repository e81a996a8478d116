//! Schema-based parameter validator for the STRAND runtime.
//!
//! `SchemaValidator` implements the `ParamValidator` trait from
//! `strand-core`. Validation runs in three phases:
//!
//! 1. **Defaults**: declared defaults fill absent (or null) fields.
//! 2. **Coercion**: lossless conversions toward the declared type:
//!    integral floats become integers, numeric strings become numbers.
//! 3. **Structural**: required fields are checked, then the params are
//!    validated against a JSON Schema document generated from the field
//!    specs using the `jsonschema` crate.
//!
//! All offending fields are collected before returning so callers see the
//! full failure set in one error. Keys the schema does not declare pass
//! through untouched.

use serde_json::{json, Map, Number, Value};
use tracing::{debug, warn};

use strand_contracts::{
    agent::Params,
    error::{StrandError, StrandResult},
    schema::{FieldSpec, FieldType},
};
use strand_core::traits::ParamValidator;

/// The STRAND parameter validator.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Build the JSON Schema document for `schema`.
    ///
    /// `required` is left out on purpose: missing fields are reported by
    /// name before structural validation runs.
    pub fn json_schema(schema: &[FieldSpec]) -> Value {
        let mut properties = Map::new();
        for field in schema {
            let mut property = match &field.constraints {
                Some(Value::Object(constraints)) => constraints.clone(),
                _ => Map::new(),
            };
            if let Some(json_type) = field.field_type.json_type() {
                property.insert("type".to_string(), json!(json_type));
            }
            properties.insert(field.name.clone(), Value::Object(property));
        }
        json!({ "type": "object", "properties": properties })
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn coerce(field_type: FieldType, value: Value) -> Value {
        match (field_type, value) {
            (FieldType::Integer, Value::Number(n)) if n.is_f64() => match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => json!(f as i64),
                _ => Value::Number(n),
            },
            (FieldType::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(i) => json!(i),
                Err(_) => Value::String(s),
            },
            (FieldType::Float | FieldType::Number, Value::String(s)) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    return json!(i);
                }
                match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => Value::String(s),
                }
            }
            (_, value) => value,
        }
    }

    /// The first segment of a JSON pointer such as `/amount/0`, or `params`
    /// for the root.
    fn field_of(pointer: &str) -> String {
        pointer
            .trim_start_matches('/')
            .split('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .unwrap_or("params")
            .to_string()
    }
}

impl ParamValidator for SchemaValidator {
    fn validate(&self, schema: &[FieldSpec], mut params: Params) -> StrandResult<Params> {
        if schema.is_empty() {
            return Ok(params);
        }

        // ── Phase 1: defaults ────────────────────────────────────────────────
        for field in schema {
            let absent = params.get(&field.name).map_or(true, Value::is_null);
            if absent {
                if let Some(default) = &field.default {
                    params.insert(field.name.clone(), default.clone());
                }
            }
        }

        // ── Phase 2: coercion ────────────────────────────────────────────────
        for field in schema {
            if let Some(value) = params.remove(&field.name) {
                params.insert(field.name.clone(), Self::coerce(field.field_type, value));
            }
        }

        // ── Phase 3: required fields, then structure ─────────────────────────
        let missing: Vec<String> = schema
            .iter()
            .filter(|f| f.required && params.get(&f.name).map_or(true, Value::is_null))
            .map(|f| f.name.clone())
            .collect();
        if !missing.is_empty() {
            warn!(fields = ?missing, "required params missing");
            return Err(StrandError::Validation {
                fields: missing,
                reason: "required field is missing".to_string(),
            });
        }

        // Optional nulls are treated as absent.
        let instance: Map<String, Value> = params
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let instance = Value::Object(instance);

        let document = Self::json_schema(schema);
        let validator = jsonschema::validator_for(&document).map_err(|e| StrandError::InvalidAction {
            reason: format!("invalid parameter schema: {e}"),
        })?;

        let mut fields: Vec<String> = Vec::new();
        let mut messages: Vec<String> = Vec::new();
        for error in validator.iter_errors(&instance) {
            let field = Self::field_of(&error.instance_path.to_string());
            messages.push(format!("{field}: {error}"));
            if !fields.contains(&field) {
                fields.push(field);
            }
        }

        if !fields.is_empty() {
            warn!(fields = ?fields, "param validation failed");
            return Err(StrandError::Validation {
                fields,
                reason: messages.join("; "),
            });
        }

        debug!(field_count = schema.len(), "params validated");
        Ok(params)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
