// src/models/profile.rs

use std::fmt;
use std::num::IntErrorKind;
use serde::Serialize;
use serde_json::{Map, Value};

/// A generated character profile. Only built by `from_value`, so every
/// instance has passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub name: String,
    pub age: i64,
    pub occupation: String,
    pub skills: Vec<String>,
    pub appearance: String,
    pub personality: String,
    pub history: String,
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    Missing,
    WrongType { expected: &'static str, found: &'static str },
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldViolation {
    pub field: String,
    pub kind: ViolationKind,
}

impl FieldViolation {
    fn missing(field: &str) -> Self {
        Self { field: field.to_string(), kind: ViolationKind::Missing }
    }

    fn wrong_type(field: impl Into<String>, expected: &'static str, found: &Value) -> Self {
        Self {
            field: field.into(),
            kind: ViolationKind::WrongType { expected, found: json_type_name(found) },
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ViolationKind::Missing => write!(f, "{}: field required", self.field),
            ViolationKind::OutOfRange => write!(f, "{}: integer out of range", self.field),
            ViolationKind::WrongType { expected, found } => {
                write!(f, "{}: expected {}, found {}", self.field, expected, found)
            }
        }
    }
}

fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Integers, floats with no fractional part, and strings holding a base-10
/// integer (surrounding whitespace allowed).
fn as_integer(field: &str, v: &Value) -> Result<i64, FieldViolation> {
    let out_of_range = || FieldViolation { field: field.to_string(), kind: ViolationKind::OutOfRange };
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if n.is_u64() {
                return Err(out_of_range());
            }
            let f = n.as_f64().ok_or_else(|| FieldViolation::wrong_type(field, "integer", v))?;
            if f.fract() != 0.0 {
                return Err(FieldViolation::wrong_type(field, "integer", v));
            }
            if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                Ok(f as i64)
            } else {
                Err(out_of_range())
            }
        }
        Value::String(s) => s.trim().parse::<i64>().map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => out_of_range(),
            _ => FieldViolation::wrong_type(field, "integer", v),
        }),
        _ => Err(FieldViolation::wrong_type(field, "integer", v)),
    }
}

fn required_string(
    obj: &Map<String, Value>,
    field: &str,
    violations: &mut Vec<FieldViolation>,
) -> Option<String> {
    match obj.get(field) {
        None => {
            violations.push(FieldViolation::missing(field));
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            violations.push(FieldViolation::wrong_type(field, "string", other));
            None
        }
    }
}

impl Profile {
    /// Checks a parsed JSON value field by field. Every violation is
    /// collected; a record is returned only when there are none.
    pub fn from_value(value: &Value) -> Result<Profile, Vec<FieldViolation>> {
        let obj = match value {
            Value::Object(obj) => obj,
            other => return Err(vec![FieldViolation::wrong_type("<root>", "object", other)]),
        };

        let mut violations = Vec::new();

        let name = required_string(obj, "name", &mut violations);

        let age = match obj.get("age") {
            None => {
                violations.push(FieldViolation::missing("age"));
                None
            }
            Some(v) => match as_integer("age", v) {
                Ok(age) => Some(age),
                Err(violation) => {
                    violations.push(violation);
                    None
                }
            },
        };

        let occupation = required_string(obj, "occupation", &mut violations);

        let skills = match obj.get("skills") {
            None => Vec::new(),
            Some(Value::Array(items)) => {
                let mut skills = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => skills.push(s.clone()),
                        other => violations.push(FieldViolation::wrong_type(
                            format!("skills[{}]", i),
                            "string",
                            other,
                        )),
                    }
                }
                skills
            }
            Some(other) => {
                violations.push(FieldViolation::wrong_type("skills", "array", other));
                Vec::new()
            }
        };

        let appearance = required_string(obj, "appearance", &mut violations);
        let personality = required_string(obj, "personality", &mut violations);
        let history = required_string(obj, "history", &mut violations);

        let bio = match obj.get("bio") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => {
                violations.push(FieldViolation::wrong_type("bio", "string or null", other));
                None
            }
        };

        match (name, age, occupation, appearance, personality, history) {
            (Some(name), Some(age), Some(occupation), Some(appearance), Some(personality), Some(history))
                if violations.is_empty() =>
            {
                Ok(Profile { name, age, occupation, skills, appearance, personality, history, bio })
            }
            _ => Err(violations),
        }
    }
}
