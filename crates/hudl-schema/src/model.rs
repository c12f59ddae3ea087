//! The schema model: messages, enums, fields, and proto3 defaults.

use crate::value::{EnumValue, MessageValue, Value};
use indexmap::IndexMap;

/// A compiled schema: every message and enum visible to one source
/// document, including definitions pulled in through imports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    pub messages: IndexMap<String, Message>,
    pub enums: IndexMap<String, EnumDef>,
    /// Import paths as written, in order of appearance.
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Message {
    pub fn field_by_number(&self, number: u32) -> Option<&Field> {
        self.fields.iter().find(|f| f.number == number)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub number: u32,
    pub ty: FieldType,
    pub repeated: bool,
}

/// Declared field types. `Named` covers both message and enum references;
/// the schema resolves which at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Named(String),
    Map(Box<FieldType>, Box<FieldType>),
}

impl FieldType {
    pub fn from_name(name: &str) -> FieldType {
        match name {
            "double" => FieldType::Double,
            "float" => FieldType::Float,
            "int32" => FieldType::Int32,
            "int64" => FieldType::Int64,
            "uint32" => FieldType::Uint32,
            "uint64" => FieldType::Uint64,
            "sint32" => FieldType::Sint32,
            "sint64" => FieldType::Sint64,
            "fixed32" => FieldType::Fixed32,
            "fixed64" => FieldType::Fixed64,
            "sfixed32" => FieldType::Sfixed32,
            "sfixed64" => FieldType::Sfixed64,
            "bool" => FieldType::Bool,
            "string" => FieldType::String,
            "bytes" => FieldType::Bytes,
            other => FieldType::Named(other.to_string()),
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, FieldType::Named(_) | FieldType::Map(_, _))
    }

    /// Varint-encoded on the wire (as opposed to fixed-width or
    /// length-delimited).
    pub fn is_varint(&self) -> bool {
        matches!(
            self,
            FieldType::Int32
                | FieldType::Int64
                | FieldType::Uint32
                | FieldType::Uint64
                | FieldType::Sint32
                | FieldType::Sint64
                | FieldType::Bool
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
    pub name: String,
    pub values: Vec<EnumEntry>,
}

pub type EnumEntry = (String, i32);

impl EnumDef {
    pub fn symbol_for(&self, number: i32) -> Option<&str> {
        self.values
            .iter()
            .find(|(_, n)| *n == number)
            .map(|(s, _)| s.as_str())
    }

    pub fn number_for(&self, symbol: &str) -> Option<i32> {
        self.values
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, n)| *n)
    }
}

impl Schema {
    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.get(name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// True when `name` refers to a declared enum rather than a message.
    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.contains_key(name)
    }

    /// Merge another schema (from an import) into this one. First
    /// definition wins, which also makes import cycles harmless.
    pub fn absorb(&mut self, other: Schema) {
        for (name, msg) in other.messages {
            self.messages.entry(name).or_insert(msg);
        }
        for (name, en) in other.enums {
            self.enums.entry(name).or_insert(en);
        }
    }

    /// The proto3 default for a declared type: zero, empty string, `false`,
    /// the zero-numbered enum symbol, null for messages.
    pub fn default_value(&self, ty: &FieldType) -> Value {
        match ty {
            FieldType::Double | FieldType::Float => Value::Float(0.0),
            FieldType::Int32
            | FieldType::Int64
            | FieldType::Uint32
            | FieldType::Uint64
            | FieldType::Sint32
            | FieldType::Sint64
            | FieldType::Fixed32
            | FieldType::Fixed64
            | FieldType::Sfixed32
            | FieldType::Sfixed64 => Value::Int(0),
            FieldType::Bool => Value::Bool(false),
            FieldType::String => Value::String(String::new()),
            FieldType::Bytes => Value::Bytes(Vec::new()),
            FieldType::Map(_, _) => Value::Map(IndexMap::new()),
            FieldType::Named(name) => {
                if let Some(en) = self.enum_def(name) {
                    let symbol = en.symbol_for(0).unwrap_or("").to_string();
                    Value::Enum(EnumValue { symbol, number: 0 })
                } else {
                    Value::Null
                }
            }
        }
    }

    /// A message value with every field at its default and nothing marked
    /// explicit. Used when the request body is empty.
    pub fn default_message(&self, name: &str) -> Option<Value> {
        let message = self.message(name)?;
        let mut out = MessageValue::new(name);
        for field in &message.fields {
            let value = if field.repeated {
                Value::List(Vec::new())
            } else {
                self.default_value(&field.ty)
            };
            out.fields.insert(field.name.clone(), value);
        }
        Some(Value::Message(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        let mut schema = Schema::default();
        schema.enums.insert(
            "Status".into(),
            EnumDef {
                name: "Status".into(),
                values: vec![("STATUS_UNKNOWN".into(), 0), ("STATUS_ACTIVE".into(), 1)],
            },
        );
        schema.messages.insert(
            "User".into(),
            Message {
                name: "User".into(),
                fields: vec![
                    Field {
                        name: "name".into(),
                        number: 1,
                        ty: FieldType::String,
                        repeated: false,
                    },
                    Field {
                        name: "status".into(),
                        number: 2,
                        ty: FieldType::Named("Status".into()),
                        repeated: false,
                    },
                    Field {
                        name: "tags".into(),
                        number: 3,
                        ty: FieldType::String,
                        repeated: true,
                    },
                ],
            },
        );
        schema
    }

    #[test]
    fn defaults_follow_proto3() {
        let schema = sample();
        assert_eq!(schema.default_value(&FieldType::Int32), Value::Int(0));
        assert_eq!(schema.default_value(&FieldType::Bool), Value::Bool(false));
        assert_eq!(
            schema.default_value(&FieldType::String),
            Value::String(String::new())
        );
        assert_eq!(
            schema.default_value(&FieldType::Named("Missing".into())),
            Value::Null
        );
    }

    #[test]
    fn enum_default_is_zero_symbol() {
        let schema = sample();
        match schema.default_value(&FieldType::Named("Status".into())) {
            Value::Enum(e) => {
                assert_eq!(e.symbol, "STATUS_UNKNOWN");
                assert_eq!(e.number, 0);
            }
            other => panic!("expected enum, got {other:?}"),
        }
    }

    #[test]
    fn default_message_fills_all_fields() {
        let schema = sample();
        let Value::Message(msg) = schema.default_message("User").unwrap() else {
            panic!("expected message");
        };
        assert_eq!(msg.fields.len(), 3);
        assert_eq!(msg.get("tags"), Some(&Value::List(vec![])));
        assert!(!msg.is_set("name"));
    }

    #[test]
    fn absorb_prefers_existing() {
        let mut a = sample();
        let mut b = Schema::default();
        b.messages.insert(
            "User".into(),
            Message {
                name: "User".into(),
                fields: vec![],
            },
        );
        a.absorb(b);
        assert_eq!(a.message("User").unwrap().fields.len(), 3);
    }
}
