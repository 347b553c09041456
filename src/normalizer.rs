//! Schema-driven normalization of upstream JSON into fully populated envelopes.
//!
//! A [`Schema`] lists every field a consumer may read together with its
//! expected shape and default. [`normalize`] copies a field only when it is
//! present with the right shape and substitutes the default otherwise, one
//! top-level field at a time. Objects with a nested schema are normalized
//! recursively, so a missing summary still comes out as a zeroed summary.
//! Normalization never fails: problems are reported in the envelope's
//! diagnostic instead.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    String,
    Number,
    Bool,
    /// Any string, number or bool.
    Scalar,
    Array,
    /// Object normalized against its own schema.
    Object(Schema),
    /// Object copied as-is (e.g. a best/top item), default may be `null`.
    Record,
    /// Anything but `null`.
    Any,
}

impl Shape {
    fn accepts(&self, value: &Value) -> bool {
        match self {
            Shape::String => value.is_string(),
            Shape::Number => value.is_number(),
            Shape::Bool => value.is_boolean(),
            Shape::Scalar => value.is_string() || value.is_number() || value.is_boolean(),
            Shape::Array => value.is_array(),
            Shape::Object(_) | Shape::Record => value.is_object(),
            Shape::Any => !value.is_null(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Shape::String => "string",
            Shape::Number => "number",
            Shape::Bool => "bool",
            Shape::Scalar => "scalar",
            Shape::Array => "array",
            Shape::Object(_) | Shape::Record => "object",
            Shape::Any => "value",
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub shape: Shape,
    pub default: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, shape: Shape, default: Value) -> Self {
        self.fields.push(FieldSpec {
            name,
            shape,
            default,
        });
        self
    }

    pub fn string(self, name: &'static str, default: &str) -> Self {
        self.field(name, Shape::String, Value::String(default.to_string()))
    }

    pub fn number(self, name: &'static str, default: i64) -> Self {
        self.field(name, Shape::Number, Value::from(default))
    }

    pub fn boolean(self, name: &'static str, default: bool) -> Self {
        self.field(name, Shape::Bool, Value::Bool(default))
    }

    pub fn scalar(self, name: &'static str) -> Self {
        self.field(name, Shape::Scalar, Value::Null)
    }

    pub fn array(self, name: &'static str) -> Self {
        self.field(name, Shape::Array, Value::Array(Vec::new()))
    }

    pub fn object(self, name: &'static str, schema: Schema) -> Self {
        self.field(name, Shape::Object(schema), Value::Null)
    }

    pub fn record(self, name: &'static str) -> Self {
        self.field(name, Shape::Record, Value::Null)
    }

    pub fn any(self, name: &'static str) -> Self {
        self.field(name, Shape::Any, Value::Null)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// The envelope every field defaulted, as returned for a failed request.
    pub fn empty(&self) -> Envelope {
        normalize(&Value::Object(Map::new()), self)
    }
}

/// Normalized response: every schema field is present.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    fields: Map<String, Value>,
    diagnostic: Option<String>,
}

impl Envelope {
    pub fn get(&self, name: &str) -> &Value {
        self.fields.get(name).unwrap_or(&Value::Null)
    }

    pub fn array(&self, name: &str) -> &[Value] {
        self.get(name).as_array().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Why some fields were defaulted, when the payload was malformed.
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn is_degraded(&self) -> bool {
        self.diagnostic.is_some()
    }

    /// JSON form; the diagnostic appears under `"diagnostic"` only when set.
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        if let Some(diagnostic) = &self.diagnostic {
            map.insert("diagnostic".to_string(), Value::String(diagnostic.clone()));
        }
        Value::Object(map)
    }

    /// Typed view over the normalized fields.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }
}

pub fn normalize(raw: &Value, schema: &Schema) -> Envelope {
    let mut problems = Vec::new();
    let fields = match raw {
        Value::Object(map) => normalize_map(map, schema, "", &mut problems),
        other => {
            problems.push(format!("expected a JSON object, found {}", kind_of(other)));
            normalize_map(&Map::new(), schema, "", &mut problems)
        }
    };

    let diagnostic = if problems.is_empty() {
        None
    } else {
        let joined = problems.join("; ");
        debug!("normalized with defaults: {}", joined);
        Some(joined)
    };

    Envelope { fields, diagnostic }
}

/// Parse then normalize; unparsable text yields the all-default envelope.
pub fn normalize_text(text: &str, schema: &Schema) -> Envelope {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => normalize(&value, schema),
        Err(e) => {
            let mut envelope = schema.empty();
            envelope.diagnostic = Some(format!("malformed JSON payload: {e}"));
            envelope
        }
    }
}

fn normalize_map(
    raw: &Map<String, Value>,
    schema: &Schema,
    path: &str,
    problems: &mut Vec<String>,
) -> Map<String, Value> {
    let mut out = Map::new();
    for spec in &schema.fields {
        let qualified = if path.is_empty() {
            spec.name.to_string()
        } else {
            format!("{path}.{}", spec.name)
        };
        let value = raw.get(spec.name).unwrap_or(&Value::Null);

        if !value.is_null() && !spec.shape.accepts(value) {
            problems.push(format!(
                "field `{qualified}`: expected {}, found {}",
                spec.shape.name(),
                kind_of(value)
            ));
        }

        let normalized = match &spec.shape {
            Shape::Object(nested) => {
                let empty = Map::new();
                let source = value.as_object().unwrap_or(&empty);
                Value::Object(normalize_map(source, nested, &qualified, problems))
            }
            shape if shape.accepts(value) => value.clone(),
            _ => spec.default.clone(),
        };
        out.insert(spec.name.to_string(), normalized);
    }
    out
}
