//! The activation stack expressions resolve identifiers against.

use hudl_schema::Value;
use indexmap::IndexMap;

/// A stack of binding frames. The root frame holds the input message's
/// fields (plus enum constants); child frames hold loop bindings and other
/// locals. Lookup walks innermost-out.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    frames: Vec<IndexMap<String, Value>>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![IndexMap::new()],
        }
    }

    /// A scope whose root frame is the given input message: each top-level
    /// field becomes a variable. Null and non-message inputs produce an
    /// empty root frame.
    pub fn with_input(input: &Value) -> Self {
        let mut scope = Self::new();
        if let Value::Message(msg) = input {
            for (name, value) in &msg.fields {
                scope.bind(name, value.clone());
            }
        } else if let Value::Map(map) = input {
            for (name, value) in map {
                scope.bind(name, value.clone());
            }
        }
        scope
    }

    pub fn push_frame(&mut self) {
        self.frames.push(IndexMap::new());
    }

    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Bind in the innermost frame.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| f.get(name))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hudl_schema::MessageValue;

    #[test]
    fn inner_frames_shadow_outer() {
        let mut scope = Scope::new();
        scope.bind("x", Value::Int(1));
        scope.push_frame();
        scope.bind("x", Value::Int(2));
        assert_eq!(scope.lookup("x"), Some(&Value::Int(2)));
        scope.pop_frame();
        assert_eq!(scope.lookup("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn root_frame_survives_pop() {
        let mut scope = Scope::new();
        scope.bind("x", Value::Int(1));
        scope.pop_frame();
        assert_eq!(scope.lookup("x"), Some(&Value::Int(1)));
    }

    #[test]
    fn with_input_exposes_fields() {
        let mut msg = MessageValue::new("D");
        msg.fields.insert("name".into(), Value::String("Ada".into()));
        let scope = Scope::with_input(&Value::Message(msg));
        assert_eq!(scope.lookup("name"), Some(&Value::String("Ada".into())));
    }

    #[test]
    fn with_null_input_is_empty() {
        let scope = Scope::with_input(&Value::Null);
        assert_eq!(scope.lookup("anything"), None);
    }
}
