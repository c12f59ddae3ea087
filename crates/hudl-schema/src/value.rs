//! The typed value space shared by the wire decoder, the expression engine,
//! and the interpreter.

use chrono::{DateTime, Duration, Utc};
use indexmap::{IndexMap, IndexSet};

/// A dynamically typed value.
///
/// Maps and message fields preserve insertion order so `each` iteration and
/// attribute emission are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Timestamp(DateTime<Utc>),
    Duration(Duration),
    Enum(EnumValue),
    Message(MessageValue),
}

/// An enum value: the wire number plus its symbolic name when the schema
/// knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub symbol: String,
    pub number: i32,
}

/// A decoded message: every schema field is present (defaults applied), and
/// `explicit` records which fields actually appeared on the wire so that
/// `has()` keeps its meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageValue {
    pub type_name: String,
    pub fields: IndexMap<String, Value>,
    pub explicit: IndexSet<String>,
}

impl MessageValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            explicit: IndexSet::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn is_set(&self, field: &str) -> bool {
        self.explicit.contains(field)
    }
}

impl Value {
    /// Truthiness for conditionals: non-empty string/list/map, nonzero
    /// number, `true`. Messages are truthy; null is not.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::List(l) => !l.is_empty(),
            Value::Map(m) => !m.is_empty(),
            Value::Enum(e) => e.number != 0,
            Value::Timestamp(_) | Value::Duration(_) | Value::Message(_) => true,
        }
    }

    /// Type name as reported by the `type()` built-in.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "double",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) | Value::Message(_) => "map",
            Value::Timestamp(_) => "timestamp",
            Value::Duration(_) => "duration",
            Value::Enum(_) => "enum",
        }
    }

    /// String form used when a value lands in HTML output.
    ///
    /// Null renders as the empty string; enums render their symbol.
    pub fn to_display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_display).collect();
                parts.join(", ")
            }
            Value::Map(m) => {
                let parts: Vec<String> =
                    m.iter().map(|(k, v)| format!("{k}: {}", v.to_display())).collect();
                parts.join(", ")
            }
            Value::Timestamp(t) => t.to_rfc3339(),
            Value::Duration(d) => format!("{}s", d.num_seconds()),
            Value::Enum(e) => e.symbol.clone(),
            Value::Message(m) => {
                let parts: Vec<String> = m
                    .fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.to_display()))
                    .collect();
                parts.join(", ")
            }
        }
    }

    /// Field lookup on message and map values. Returns `None` on scalar
    /// receivers and on missing keys; the expression engine degrades that
    /// to null.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Message(m) => m.get(name),
            Value::Map(m) => m.get(name),
            _ => None,
        }
    }

    /// Length as reported by `size()`.
    pub fn size(&self) -> Option<usize> {
        match self {
            Value::String(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            Value::List(l) => Some(l.len()),
            Value::Map(m) => Some(m.len()),
            Value::Message(m) => Some(m.fields.len()),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::String("x".into()).is_truthy());
        assert!(Value::List(vec![Value::Null]).is_truthy());
    }

    #[test]
    fn enum_truthiness_follows_number() {
        let zero = Value::Enum(EnumValue {
            symbol: "S_ACTIVE".into(),
            number: 0,
        });
        let one = Value::Enum(EnumValue {
            symbol: "S_PENDING".into(),
            number: 1,
        });
        assert!(!zero.is_truthy());
        assert!(one.is_truthy());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Null.to_display(), "");
        assert_eq!(Value::Int(42).to_display(), "42");
        assert_eq!(Value::Bool(false).to_display(), "false");
        assert_eq!(
            Value::Enum(EnumValue {
                symbol: "ROLE_ADMIN".into(),
                number: 1
            })
            .to_display(),
            "ROLE_ADMIN"
        );
    }

    #[test]
    fn message_presence_tracking() {
        let mut msg = MessageValue::new("User");
        msg.fields.insert("name".into(), Value::String("Ada".into()));
        msg.explicit.insert("name".into());
        msg.fields.insert("email".into(), Value::String(String::new()));

        assert!(msg.is_set("name"));
        assert!(!msg.is_set("email"));
        assert_eq!(msg.get("email"), Some(&Value::String(String::new())));
    }

    #[test]
    fn size_of_string_counts_chars() {
        assert_eq!(Value::String("héllo".into()).size(), Some(5));
        assert_eq!(Value::Int(3).size(), None);
    }
}
