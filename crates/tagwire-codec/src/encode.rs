//! Recursive encoder.
//!
//! The inverse of the decoder: typed instances reverse-resolve their tag,
//! emit the reserved key first and then every exported field not in the
//! suppressed set, in declaration order. Output is deterministic — the same
//! value state always yields the same bytes.

use serde_json::{Map, Value};

use crate::TYPE_KEY;
use crate::error::{CodecError, CodecResult};
use crate::registry::Registry;
use crate::value::{Decoded, Instance};

/// Encode engine over one registry snapshot.
pub struct Encoder<'r> {
    registry: &'r Registry,
}

impl<'r> Encoder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Serialize a value tree to a JSON string.
    pub fn dumper(&self, value: &Decoded) -> CodecResult<String> {
        let value = self.encode_value(value)?;
        serde_json::to_string(&value).map_err(|err| CodecError::Serialize(err.to_string()))
    }

    /// Encode one value into a generic JSON tree, recursively.
    pub fn encode_value(&self, value: &Decoded) -> CodecResult<Value> {
        match value {
            Decoded::Null => Ok(Value::Null),
            Decoded::Bool(b) => Ok(Value::Bool(*b)),
            Decoded::Number(n) => Ok(Value::Number(n.clone())),
            Decoded::String(s) => Ok(Value::String(s.clone())),
            Decoded::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.encode_value(item)?);
                }
                Ok(Value::Array(out))
            }
            Decoded::Map(fields) => {
                let mut out = Map::new();
                for (name, value) in fields {
                    out.insert(name.clone(), self.encode_value(value)?);
                }
                Ok(Value::Object(out))
            }
            Decoded::Object(inst) => self.encode_instance(inst),
        }
    }

    fn encode_instance(&self, inst: &Instance) -> CodecResult<Value> {
        // No bound tag is a registry configuration defect; fail loudly
        // instead of emitting an untagged object.
        let descriptor = self
            .registry
            .reverse_resolve(inst.type_id())
            .ok_or(CodecError::UnregisteredType(inst.type_name()))?;

        let mut out = Map::new();
        out.insert(TYPE_KEY.to_string(), Value::String(descriptor.tag.clone()));
        for (name, value) in inst.wire_fields() {
            if descriptor.suppressed.contains(&name) {
                continue;
            }
            out.insert(name, self.encode_value(&value)?);
        }
        Ok(Value::Object(out))
    }
}
