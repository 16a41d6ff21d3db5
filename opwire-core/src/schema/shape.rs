use std::collections::BTreeMap;

use serde_json::Value;

use crate::schema::refs::SELF_REFERENCE_KEY;

/// Tagged-variant schema representation built once at load time. Everything
/// downstream (validation, stringification) walks this instead of raw
/// documents, so there is no per-API special-casing outside this module.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaShape {
    String,
    Number,
    Boolean,
    Object {
        properties: BTreeMap<String, SchemaShape>,
        required: Vec<String>,
    },
    Array {
        items: Box<SchemaShape>,
    },
    Union {
        variants: Vec<SchemaShape>,
    },
    Any,
}

/// Pure recursive walk from a raw (already `$ref`-inlined) schema value.
/// Unknown or absent type information degrades to `Any`.
pub fn shape_of(schema: &Value) -> SchemaShape {
    let Some(obj) = schema.as_object() else {
        return SchemaShape::Any;
    };
    if obj.contains_key(SELF_REFERENCE_KEY) {
        return SchemaShape::Any;
    }
    for key in ["oneOf", "anyOf"] {
        if let Some(variants) = obj.get(key).and_then(|v| v.as_array()) {
            return SchemaShape::Union {
                variants: variants.iter().map(shape_of).collect(),
            };
        }
    }

    match obj.get("type").and_then(|v| v.as_str()) {
        Some("string") => SchemaShape::String,
        Some("integer") | Some("number") => SchemaShape::Number,
        Some("boolean") => SchemaShape::Boolean,
        Some("array") => SchemaShape::Array {
            items: Box::new(obj.get("items").map(shape_of).unwrap_or(SchemaShape::Any)),
        },
        Some("object") => object_shape(obj),
        // Untyped but with properties: treat as an object schema.
        None if obj.contains_key("properties") => object_shape(obj),
        _ => SchemaShape::Any,
    }
}

fn object_shape(obj: &serde_json::Map<String, Value>) -> SchemaShape {
    let properties = obj
        .get("properties")
        .and_then(|v| v.as_object())
        .map(|props| {
            props
                .iter()
                .map(|(k, v)| (k.clone(), shape_of(v)))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();
    let required = obj
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default();
    SchemaShape::Object {
        properties,
        required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_shapes() {
        assert_eq!(shape_of(&json!({"type": "string"})), SchemaShape::String);
        assert_eq!(shape_of(&json!({"type": "integer"})), SchemaShape::Number);
        assert_eq!(shape_of(&json!({"type": "boolean"})), SchemaShape::Boolean);
        assert_eq!(shape_of(&json!({})), SchemaShape::Any);
        assert_eq!(shape_of(&json!(null)), SchemaShape::Any);
    }

    #[test]
    fn nested_object_and_array() {
        let shape = shape_of(&json!({
            "type": "object",
            "required": ["ids"],
            "properties": {
                "ids": {"type": "array", "items": {"type": "integer"}}
            }
        }));
        let SchemaShape::Object {
            properties,
            required,
        } = shape
        else {
            panic!("expected object shape");
        };
        assert_eq!(required, vec!["ids".to_string()]);
        assert_eq!(
            properties["ids"],
            SchemaShape::Array {
                items: Box::new(SchemaShape::Number)
            }
        );
    }

    #[test]
    fn one_of_becomes_union() {
        let shape = shape_of(&json!({"oneOf": [{"type": "string"}, {"type": "number"}]}));
        assert_eq!(
            shape,
            SchemaShape::Union {
                variants: vec![SchemaShape::String, SchemaShape::Number]
            }
        );
    }

    #[test]
    fn self_reference_placeholder_is_any() {
        let shape = shape_of(&json!({ SELF_REFERENCE_KEY: "#/defs/node" }));
        assert_eq!(shape, SchemaShape::Any);
    }
}
