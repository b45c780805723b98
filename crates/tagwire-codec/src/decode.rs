//! Recursive-descent decoder.
//!
//! Walks a generic JSON tree; any object carrying the reserved
//! [`TYPE_KEY`](crate::TYPE_KEY) is resolved against the registry, validated
//! through its bound schema, and built into a typed instance. Everything else
//! passes through structurally.

use serde_json::{Map, Value};

use crate::TYPE_KEY;
use crate::error::{CodecError, CodecResult, DecodeError};
use crate::registry::Registry;
use crate::value::{Decoded, FieldMap};

/// Decode engine over one registry snapshot.
pub struct Decoder<'r> {
    registry: &'r Registry,
}

impl<'r> Decoder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    /// Decode a raw UTF-8 JSON body into a value tree.
    pub fn loader(&self, bytes: &[u8]) -> CodecResult<Decoded> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|err| DecodeError::Syntax(err.to_string()))?;
        self.decode_value(&value)
    }

    /// Decode one already-parsed JSON value, recursively.
    pub fn decode_value(&self, value: &Value) -> CodecResult<Decoded> {
        match value {
            Value::Null => Ok(Decoded::Null),
            Value::Bool(b) => Ok(Decoded::Bool(*b)),
            Value::Number(n) => Ok(Decoded::Number(n.clone())),
            Value::String(s) => Ok(Decoded::String(s.clone())),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.decode_value(item)?);
                }
                Ok(Decoded::List(out))
            }
            Value::Object(map) => match map.get(TYPE_KEY) {
                Some(tag) => {
                    // A non-string tag can never resolve; report it through
                    // the same unknown-type path.
                    let tag = match tag {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    self.decode_tagged(&tag, map)
                }
                None => {
                    let mut fields = FieldMap::new();
                    for (name, value) in map {
                        fields.insert(name.clone(), self.decode_value(value)?);
                    }
                    Ok(Decoded::Map(fields))
                }
            },
        }
    }

    fn decode_tagged(&self, tag: &str, raw: &Map<String, Value>) -> CodecResult<Decoded> {
        let descriptor = self.registry.resolve(tag)?;

        // Schema pass first: declared fields come back already decoded, with
        // every violation aggregated into one error.
        let mut validated = match &descriptor.schema {
            Some(schema) => Some(schema.validate(tag, raw, self)?),
            None => None,
        };

        let mut fields = FieldMap::new();
        for (name, value) in raw {
            if name.as_str() == TYPE_KEY {
                continue;
            }
            let decoded = match validated.as_mut().and_then(|v| v.shift_remove(name)) {
                Some(clean) => clean,
                None => self.decode_value(value)?,
            };
            fields.insert(name.clone(), decoded);
        }

        let instance = (descriptor.builder)(fields).map_err(|source| CodecError::Build {
            tag: tag.to_string(),
            source,
        })?;
        Ok(Decoded::Object(instance))
    }

    /// Top-level assertion that a decoded body is an instance of `expected`.
    ///
    /// Applied at most once per request, after decode, when the route
    /// declared an expectation.
    pub fn ensure_type(&self, value: &Decoded, expected: &str) -> CodecResult<()> {
        // An unregistered expectation is a route misconfiguration, not a bad
        // request; surface the unknown tag instead of a mismatch.
        self.registry.resolve(expected)?;
        if let Decoded::Object(inst) = value {
            if self.registry.tag_of(inst).as_deref() == Some(expected) {
                return Ok(());
            }
        }
        Err(CodecError::type_mismatch(expected, self.kind_of(value)))
    }

    /// Kind name for diagnostics: the registered tag for typed instances,
    /// the wire kind otherwise.
    pub fn kind_of(&self, value: &Decoded) -> String {
        match value {
            Decoded::Object(inst) => self
                .registry
                .tag_of(inst)
                .unwrap_or_else(|| inst.type_name().to_string()),
            other => other.kind().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{WireObject, WireType};
    use crate::schema::{FieldRule, Schema};
    use crate::value::FieldAccess;
    use serde_json::json;
    use std::any::Any;

    #[derive(Debug, Clone, PartialEq)]
    struct Person {
        first_name: String,
        last_name: String,
    }

    impl WireObject for Person {
        fn wire_fields(&self) -> FieldMap {
            FieldMap::from([
                (
                    "first_name".to_string(),
                    Decoded::from(self.first_name.clone()),
                ),
                (
                    "last_name".to_string(),
                    Decoded::from(self.last_name.clone()),
                ),
            ])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Color {
        name: String,
    }

    impl WireObject for Color {
        fn wire_fields(&self) -> FieldMap {
            FieldMap::from([("name".to_string(), Decoded::from(self.name.clone()))])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Widget {
        kind: String,
        colors: Vec<Color>,
    }

    impl WireObject for Widget {
        fn wire_fields(&self) -> FieldMap {
            FieldMap::from([
                ("kind".to_string(), Decoded::from(self.kind.clone())),
                (
                    "colors".to_string(),
                    Decoded::List(self.colors.iter().cloned().map(Decoded::object).collect()),
                ),
            ])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn person_type() -> WireType<Person> {
        WireType::new("Person", |mut fields: FieldMap| {
            Ok(Person {
                first_name: fields.take_string("first_name")?,
                last_name: fields.take_string("last_name")?,
            })
        })
    }

    fn full_registry() -> Registry {
        let registry = Registry::new();
        registry
            .register(person_type().with_schema(
                Schema::new()
                    .field("first_name", FieldRule::string())
                    .field("last_name", FieldRule::string()),
            ))
            .unwrap();
        registry
            .register(WireType::new("Color", |mut fields: FieldMap| {
                Ok(Color {
                    name: fields.take_string("name")?,
                })
            }))
            .unwrap();
        registry
            .register(
                WireType::new("Widget", |mut fields: FieldMap| {
                    Ok(Widget {
                        kind: fields.take_string("kind")?,
                        colors: fields.take_objects("colors")?,
                    })
                })
                .with_schema(
                    Schema::new()
                        .field("kind", FieldRule::string())
                        .field("colors", FieldRule::list(FieldRule::ensure_type("Color"))),
                ),
            )
            .unwrap();
        registry
    }

    #[test]
    fn scalars_pass_through() {
        let registry = Registry::new();
        let decoder = Decoder::new(&registry);
        assert_eq!(decoder.loader(b"42").unwrap(), Decoded::from(42i64));
        assert_eq!(decoder.loader(b"\"hi\"").unwrap(), Decoded::from("hi"));
        assert_eq!(decoder.loader(b"null").unwrap(), Decoded::Null);
        assert_eq!(
            decoder.loader(b"[1, 2]").unwrap(),
            Decoded::from(vec![1i64, 2])
        );
    }

    #[test]
    fn malformed_json_is_a_syntax_error() {
        let registry = Registry::new();
        let decoder = Decoder::new(&registry);
        let err = decoder.loader(b"{not json").unwrap_err();
        assert!(matches!(
            err,
            CodecError::Decode(DecodeError::Syntax(_))
        ));
    }

    #[test]
    fn untagged_object_decodes_to_ordered_map() {
        let registry = Registry::new();
        let decoder = Decoder::new(&registry);
        let value = decoder.loader(br#"{"b": 1, "a": 2}"#).unwrap();
        match value {
            Decoded::Map(fields) => {
                let keys: Vec<_> = fields.keys().cloned().collect();
                assert_eq!(keys, vec!["b", "a"]);
            }
            other => panic!("expected map, got {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_deterministic() {
        let registry = Registry::new();
        let decoder = Decoder::new(&registry);
        let err = decoder
            .loader(br#"{"__type__": "Foo", "value": 42}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Cannot decode object Foo. No such object.");
    }

    #[test]
    fn tagged_object_builds_typed_instance() {
        let registry = full_registry();
        let decoder = Decoder::new(&registry);
        let value = decoder
            .loader(br#"{"__type__": "Person", "first_name": "bob", "last_name": "smith"}"#)
            .unwrap();
        let person = value
            .as_instance()
            .and_then(|inst| inst.downcast_ref::<Person>())
            .expect("typed person");
        assert_eq!(person.first_name, "bob");
        assert_eq!(person.last_name, "smith");
    }

    #[test]
    fn validation_failures_aggregate() {
        let registry = full_registry();
        let decoder = Decoder::new(&registry);
        let err = decoder
            .loader(br#"{"__type__": "Person", "first_name": 1, "last_name": "smith"}"#)
            .unwrap_err();
        match err {
            CodecError::Validation(v) => {
                assert_eq!(v.message, "Error validating object Person");
                assert_eq!(v.fields["first_name"], "Expected str got int instead.");
                assert!(!v.fields.contains_key("last_name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn nested_tagged_objects_resolve_before_build() {
        let registry = full_registry();
        let decoder = Decoder::new(&registry);
        let value = decoder
            .loader(
                br#"{"__type__": "Widget", "kind": "spinner",
                     "colors": [{"__type__": "Color", "name": "red"},
                                {"__type__": "Color", "name": "blue"}]}"#,
            )
            .unwrap();
        let widget = value
            .as_instance()
            .and_then(|inst| inst.downcast_ref::<Widget>())
            .expect("typed widget");
        assert_eq!(widget.kind, "spinner");
        assert_eq!(widget.colors.len(), 2);
        assert_eq!(widget.colors[1].name, "blue");
    }

    #[test]
    fn builder_failure_is_fatal_not_validation() {
        // No schema bound, so the builder sees the raw field map and rejects.
        let registry = Registry::new();
        registry.register(person_type()).unwrap();
        let decoder = Decoder::new(&registry);
        let err = decoder
            .loader(br#"{"__type__": "Person", "first_name": "bob"}"#)
            .unwrap_err();
        match err {
            CodecError::Build { tag, .. } => assert_eq!(tag, "Person"),
            other => panic!("expected build error, got {other:?}"),
        }
    }

    #[test]
    fn ensure_type_accepts_matching_instance() {
        let registry = full_registry();
        let decoder = Decoder::new(&registry);
        let value = decoder
            .loader(br#"{"__type__": "Person", "first_name": "bob", "last_name": "smith"}"#)
            .unwrap();
        decoder.ensure_type(&value, "Person").unwrap();
    }

    #[test]
    fn ensure_type_rejects_untyped_value() {
        let registry = full_registry();
        let decoder = Decoder::new(&registry);
        let value = decoder.loader(b"[1, 2, 3]").unwrap();
        let err = decoder.ensure_type(&value, "Person").unwrap_err();
        assert_eq!(err.to_string(), "Expected Person got list instead.");
    }

    #[test]
    fn ensure_type_with_unregistered_tag_is_an_unknown_type() {
        let registry = full_registry();
        let decoder = Decoder::new(&registry);
        let value = decoder
            .loader(br#"{"__type__": "Person", "first_name": "bob", "last_name": "smith"}"#)
            .unwrap();
        let err = decoder.ensure_type(&value, "Persno").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot decode object Persno. No such object."
        );
    }

    #[test]
    fn ensure_type_rejects_other_wire_type() {
        let registry = full_registry();
        let decoder = Decoder::new(&registry);
        let value = decoder
            .loader(br#"{"__type__": "Color", "name": "red"}"#)
            .unwrap();
        let err = decoder.ensure_type(&value, "Person").unwrap_err();
        assert_eq!(err.to_string(), "Expected Person got Color instead.");
    }
}
