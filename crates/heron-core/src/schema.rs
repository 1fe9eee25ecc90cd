//! Declarative value schemas.
//!
//! A [`Schema`] describes the shape an endpoint expects for a query
//! parameter or a JSON body. Schemas are plain data: the same value drives
//! request validation and the generated API document.
//!
//! ```
//! use heron_core::schema::{ObjectSchema, Schema, StringRule};
//! use serde_json::json;
//!
//! let body: Schema = ObjectSchema::new()
//!     .field("name", StringRule::new().min_len(1))
//!     .optional("age", Schema::integer())
//!     .into();
//!
//! assert!(body.check(&json!({"name": "ada"})).is_empty());
//! assert_eq!(body.check(&json!({"age": "x"})).len(), 2);
//! ```

use indexmap::IndexMap;
use serde_json::Value;

/// A typed constraint over one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// A string, optionally constrained.
    String(StringRule),
    /// An integer with optional inclusive bounds.
    Integer {
        /// Inclusive lower bound.
        minimum: Option<i64>,
        /// Inclusive upper bound.
        maximum: Option<i64>,
    },
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// A list whose items all match the inner schema.
    Array(Box<Schema>),
    /// An object with named fields.
    Object(ObjectSchema),
    /// Anything at all.
    Any,
}

/// Constraints on a string value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringRule {
    /// Minimum length in characters.
    pub min_len: Option<usize>,
    /// Maximum length in characters.
    pub max_len: Option<usize>,
    /// The value must be one of these.
    pub one_of: Option<Vec<String>>,
    /// Replaces the generated message when `one_of` fails.
    pub message: Option<String>,
}

impl StringRule {
    /// An unconstrained string.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires at least `n` characters.
    #[must_use]
    pub fn min_len(mut self, n: usize) -> Self {
        self.min_len = Some(n);
        self
    }

    /// Allows at most `n` characters.
    #[must_use]
    pub fn max_len(mut self, n: usize) -> Self {
        self.max_len = Some(n);
        self
    }

    /// Restricts the value to a fixed set.
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Custom message reported when the value is not in the allowed set.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn violations(&self, s: &str) -> Vec<String> {
        let mut out = Vec::new();
        let len = s.chars().count();
        if let Some(min) = self.min_len {
            if len < min {
                out.push(format!("String must contain at least {min} character(s)"));
            }
        }
        if let Some(max) = self.max_len {
            if len > max {
                out.push(format!("String must contain at most {max} character(s)"));
            }
        }
        if let Some(allowed) = &self.one_of {
            if !allowed.iter().any(|a| a == s) {
                out.push(self.message.clone().unwrap_or_else(|| {
                    let expected = allowed
                        .iter()
                        .map(|a| format!("'{a}'"))
                        .collect::<Vec<_>>()
                        .join(" | ");
                    format!("Invalid enum value. Expected {expected}, received '{s}'")
                }));
            }
        }
        out
    }
}

impl From<StringRule> for Schema {
    fn from(rule: StringRule) -> Self {
        Self::String(rule)
    }
}

/// A named field inside an object schema or a query rule set.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// The field's schema.
    pub schema: Schema,
    /// Whether the field may be absent.
    pub optional: bool,
}

impl Field {
    /// A field that must be present.
    #[must_use]
    pub fn required(schema: impl Into<Schema>) -> Self {
        Self {
            schema: schema.into(),
            optional: false,
        }
    }

    /// A field that may be absent.
    #[must_use]
    pub fn optional(schema: impl Into<Schema>) -> Self {
        Self {
            schema: schema.into(),
            optional: true,
        }
    }
}

/// The fields of an object, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    /// Declared fields.
    pub fields: IndexMap<String, Field>,
}

impl ObjectSchema {
    /// An object with no declared fields.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a required field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.fields.insert(name.into(), Field::required(schema));
        self
    }

    /// Adds an optional field.
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        self.fields.insert(name.into(), Field::optional(schema));
        self
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Self::Object(object)
    }
}

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Dotted path to the failing value; empty for the root.
    pub path: String,
    /// Human-readable description.
    pub message: String,
}

impl Schema {
    /// An unconstrained string.
    #[must_use]
    pub fn string() -> Self {
        Self::String(StringRule::new())
    }

    /// An unbounded integer.
    #[must_use]
    pub const fn integer() -> Self {
        Self::Integer {
            minimum: None,
            maximum: None,
        }
    }

    /// An integer within `[minimum, maximum]`.
    #[must_use]
    pub const fn integer_between(minimum: i64, maximum: i64) -> Self {
        Self::Integer {
            minimum: Some(minimum),
            maximum: Some(maximum),
        }
    }

    /// An array of `items`.
    #[must_use]
    pub fn array(items: impl Into<Schema>) -> Self {
        Self::Array(Box::new(items.into()))
    }

    /// The type name used in messages and documents.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Integer { .. } => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Any => "any",
        }
    }

    /// Checks a JSON value, returning every violation found.
    ///
    /// Object fields are all visited even after a failure.
    #[must_use]
    pub fn check(&self, value: &Value) -> Vec<SchemaViolation> {
        let mut out = Vec::new();
        self.check_at(value, "", &mut out);
        out
    }

    fn check_at(&self, value: &Value, path: &str, out: &mut Vec<SchemaViolation>) {
        let at = |message: String| SchemaViolation {
            path: path.to_string(),
            message,
        };

        match (self, value) {
            (Self::Any, _) => {}
            (Self::String(rule), Value::String(s)) => {
                out.extend(rule.violations(s).into_iter().map(at));
            }
            (Self::Integer { minimum, maximum }, Value::Number(n)) => match n.as_i64() {
                Some(i) => out.extend(bound_violations(i, *minimum, *maximum).into_iter().map(at)),
                None => out.push(at("Expected integer, received float".to_string())),
            },
            (Self::Number, Value::Number(_)) | (Self::Boolean, Value::Bool(_)) => {}
            (Self::Array(items), Value::Array(values)) => {
                for (i, item) in values.iter().enumerate() {
                    items.check_at(item, &join_path(path, &i.to_string()), out);
                }
            }
            (Self::Object(object), Value::Object(map)) => {
                for (name, field) in &object.fields {
                    let child = join_path(path, name);
                    match map.get(name) {
                        None | Some(Value::Null) if field.optional => {}
                        None => out.push(SchemaViolation {
                            path: child,
                            message: "Required".to_string(),
                        }),
                        Some(v) => field.schema.check_at(v, &child, out),
                    }
                }
            }
            (expected, actual) => out.push(at(format!(
                "Expected {}, received {}",
                expected.type_name(),
                json_type_name(actual)
            ))),
        }
    }

    /// Checks a raw query-string value and converts it to JSON.
    ///
    /// Integers, numbers and booleans are parsed from text; arrays and
    /// objects cannot be expressed in a single query value.
    pub fn check_raw(&self, raw: &str) -> Result<Value, Vec<String>> {
        match self {
            Self::Any => Ok(Value::String(raw.to_string())),
            Self::String(rule) => {
                let violations = rule.violations(raw);
                if violations.is_empty() {
                    Ok(Value::String(raw.to_string()))
                } else {
                    Err(violations)
                }
            }
            Self::Integer { minimum, maximum } => {
                let i: i64 = raw
                    .parse()
                    .map_err(|_| vec![format!("Expected integer, received '{raw}'")])?;
                let violations = bound_violations(i, *minimum, *maximum);
                if violations.is_empty() {
                    Ok(Value::from(i))
                } else {
                    Err(violations)
                }
            }
            Self::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| vec![format!("Expected number, received '{raw}'")]),
            Self::Boolean => match raw {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(vec![format!("Expected boolean, received '{raw}'")]),
            },
            Self::Array(_) | Self::Object(_) => Err(vec![format!(
                "Expected {}, received string",
                self.type_name()
            )]),
        }
    }
}

fn bound_violations(i: i64, minimum: Option<i64>, maximum: Option<i64>) -> Vec<String> {
    let mut out = Vec::new();
    if let Some(min) = minimum {
        if i < min {
            out.push(format!("Number must be greater than or equal to {min}"));
        }
    }
    if let Some(max) = maximum {
        if i > max {
            out.push(format!("Number must be less than or equal to {max}"));
        }
    }
    out
}

fn join_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}.{segment}")
    }
}

/// Names the JSON type of a value the way messages report it.
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
