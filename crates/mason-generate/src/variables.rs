// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mason Contributors

//! Variable validation and coercion.

use indexmap::IndexMap;
use mason_brick::{VarType, VariableDef};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VariableValidationError {
    #[error("missing required variable(s): {}", missing.join(", "))]
    Missing { missing: Vec<String> },
    #[error("variable {name:?} value {value} is not one of {allowed:?}")]
    EnumValueNotAllowed {
        name: String,
        value: Value,
        allowed: Vec<Value>,
    },
}

/// Validates `input` against `defs`, filling in declared defaults and
/// coercing declared types. Keys present in `input` but not declared in
/// `defs` (e.g. a variable a `preGen` hook injected at runtime) pass through
/// unchanged, so hook-introduced variables still reach template rendering.
pub fn validate_and_coerce(
    defs: &IndexMap<String, VariableDef>,
    input: &Value,
) -> Result<Value, VariableValidationError> {
    let input_map = input.as_object().cloned().unwrap_or_default();
    let mut out: Map<String, Value> = input_map.clone();
    let mut missing = Vec::new();

    for (name, def) in defs {
        match input_map.get(name) {
            Some(v) => {
                out.insert(name.clone(), coerce_value(name, v, def)?);
            }
            None => match &def.default {
                Some(default) => {
                    out.insert(name.clone(), default.clone());
                }
                None => missing.push(name.clone()),
            },
        }
    }

    if !missing.is_empty() {
        return Err(VariableValidationError::Missing { missing });
    }

    Ok(Value::Object(out))
}

fn coerce_value(
    name: &str,
    v: &Value,
    def: &VariableDef,
) -> Result<Value, VariableValidationError> {
    let coerced = match def.var_type {
        VarType::String => match v {
            Value::String(_) => v.clone(),
            Value::Null => v.clone(),
            other => Value::String(value_to_plain_string(other)),
        },
        VarType::Number => match v {
            Value::Number(_) => v.clone(),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| v.clone()),
            other => other.clone(),
        },
        VarType::Boolean => match v {
            Value::Bool(_) => v.clone(),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Value::Bool(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Value::Bool(false),
            other => other.clone(),
        },
        VarType::Enum => {
            if let Some(allowed) = &def.values {
                if !allowed.contains(v) {
                    return Err(VariableValidationError::EnumValueNotAllowed {
                        name: name.to_string(),
                        value: v.clone(),
                        allowed: allowed.clone(),
                    });
                }
            }
            v.clone()
        }
        VarType::Array => v.clone(),
    };
    Ok(coerced)
}

fn value_to_plain_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn string_def() -> VariableDef {
        VariableDef {
            var_type: VarType::String,
            description: None,
            default: None,
            prompt: None,
            values: None,
        }
    }

    #[test]
    fn missing_required_variable_is_reported() {
        let mut defs = IndexMap::new();
        defs.insert("name".to_string(), string_def());
        let err = validate_and_coerce(&defs, &json!({})).unwrap_err();
        assert_eq!(
            err,
            VariableValidationError::Missing {
                missing: vec!["name".to_string()]
            }
        );
    }

    #[test]
    fn default_fills_in_missing_variable() {
        let mut defs = IndexMap::new();
        let mut def = string_def();
        def.default = Some(json!("Dash"));
        defs.insert("name".to_string(), def);
        let out = validate_and_coerce(&defs, &json!({})).unwrap();
        assert_eq!(out["name"], json!("Dash"));
    }

    #[test]
    fn number_strings_are_coerced() {
        let mut defs = IndexMap::new();
        defs.insert(
            "age".to_string(),
            VariableDef {
                var_type: VarType::Number,
                description: None,
                default: None,
                prompt: None,
                values: None,
            },
        );
        let out = validate_and_coerce(&defs, &json!({"age": "42"})).unwrap();
        assert_eq!(out["age"], json!(42.0));
    }

    #[test]
    fn boolean_strings_are_coerced() {
        let mut defs = IndexMap::new();
        defs.insert(
            "flag".to_string(),
            VariableDef {
                var_type: VarType::Boolean,
                description: None,
                default: None,
                prompt: None,
                values: None,
            },
        );
        let out = validate_and_coerce(&defs, &json!({"flag": "true"})).unwrap();
        assert_eq!(out["flag"], json!(true));
    }

    #[test]
    fn arrays_pass_through_unconverted() {
        let mut defs = IndexMap::new();
        defs.insert(
            "items".to_string(),
            VariableDef {
                var_type: VarType::Array,
                description: None,
                default: None,
                prompt: None,
                values: None,
            },
        );
        let out = validate_and_coerce(&defs, &json!({"items": [1, "two", true]})).unwrap();
        assert_eq!(out["items"], json!([1, "two", true]));
    }

    #[test]
    fn undeclared_keys_pass_through() {
        let defs = IndexMap::new();
        let out = validate_and_coerce(&defs, &json!({"extra": "x"})).unwrap();
        assert_eq!(out["extra"], json!("x"));
    }

    #[test]
    fn enum_member_value_passes_through() {
        let mut defs = IndexMap::new();
        defs.insert(
            "color".to_string(),
            VariableDef {
                var_type: VarType::Enum,
                description: None,
                default: None,
                prompt: None,
                values: Some(vec![json!("red"), json!("blue")]),
            },
        );
        let out = validate_and_coerce(&defs, &json!({"color": "blue"})).unwrap();
        assert_eq!(out["color"], json!("blue"));
    }

    #[test]
    fn enum_non_member_value_is_rejected() {
        let mut defs = IndexMap::new();
        defs.insert(
            "color".to_string(),
            VariableDef {
                var_type: VarType::Enum,
                description: None,
                default: None,
                prompt: None,
                values: Some(vec![json!("red"), json!("blue")]),
            },
        );
        let err = validate_and_coerce(&defs, &json!({"color": "green"})).unwrap_err();
        assert_eq!(
            err,
            VariableValidationError::EnumValueNotAllowed {
                name: "color".to_string(),
                value: json!("green"),
                allowed: vec![json!("red"), json!("blue")],
            }
        );
    }
}
