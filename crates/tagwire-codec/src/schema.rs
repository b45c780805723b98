//! Field-level validation rules.
//!
//! A [`Schema`] is an ordered set of named [`FieldRule`]s bound to a type tag
//! at registration. Validation is a single full pass: every violated field is
//! reported, in declaration order, never just the first. Rules are pure —
//! they either coerce the raw JSON value into a [`Decoded`] or produce a
//! field-scoped message.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::decode::Decoder;
use crate::error::{CodecResult, ValidationError};
use crate::value::{Decoded, FieldMap, json_kind};

/// A single field rule: kind check plus requiredness.
#[derive(Debug, Clone)]
pub struct FieldRule {
    kind: RuleKind,
    optional: bool,
}

#[derive(Debug, Clone)]
enum RuleKind {
    String { max_len: Option<usize> },
    Integer,
    Float,
    Number,
    Boolean,
    List(Box<FieldRule>),
    EnsureType(String),
}

impl FieldRule {
    /// Value must be a JSON string.
    pub fn string() -> Self {
        Self::of(RuleKind::String { max_len: None })
    }

    /// Value must be a JSON string of at most `max_len` characters.
    pub fn string_max(max_len: usize) -> Self {
        Self::of(RuleKind::String {
            max_len: Some(max_len),
        })
    }

    /// Value must be a JSON integer.
    pub fn integer() -> Self {
        Self::of(RuleKind::Integer)
    }

    /// Value must be a JSON float. Integers are not coerced.
    pub fn float() -> Self {
        Self::of(RuleKind::Float)
    }

    /// Value must be any JSON number.
    pub fn number() -> Self {
        Self::of(RuleKind::Number)
    }

    pub fn boolean() -> Self {
        Self::of(RuleKind::Boolean)
    }

    /// Value must be a JSON array; every element is validated by `element`.
    pub fn list(element: FieldRule) -> Self {
        Self::of(RuleKind::List(Box::new(element)))
    }

    /// Value must decode into an instance of the registered type `tag`.
    ///
    /// The sub-value is decoded first, then checked: an object lacking the
    /// reserved key decodes to a plain map and fails here as
    /// `Expected <Tag> got dict instead.`, not as a decode failure.
    pub fn ensure_type(tag: impl Into<String>) -> Self {
        Self::of(RuleKind::EnsureType(tag.into()))
    }

    /// Accept a missing field. A present field is still validated.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    fn of(kind: RuleKind) -> Self {
        Self {
            kind,
            optional: false,
        }
    }

    fn check(&self, raw: &Value, decoder: &Decoder<'_>) -> Result<Decoded, RuleFailure> {
        match &self.kind {
            RuleKind::String { max_len } => match raw {
                Value::String(s) => {
                    if let Some(max) = max_len {
                        if s.chars().count() > *max {
                            return Err(RuleFailure::message(format!(
                                "String exceeds max length of {max}."
                            )));
                        }
                    }
                    Ok(Decoded::String(s.clone()))
                }
                other => Err(RuleFailure::expected("str", other)),
            },
            RuleKind::Integer => match raw {
                Value::Number(n) if !n.is_f64() => Ok(Decoded::Number(n.clone())),
                other => Err(RuleFailure::expected("int", other)),
            },
            RuleKind::Float => match raw {
                Value::Number(n) if n.is_f64() => Ok(Decoded::Number(n.clone())),
                other => Err(RuleFailure::expected("float", other)),
            },
            RuleKind::Number => match raw {
                Value::Number(n) => Ok(Decoded::Number(n.clone())),
                other => Err(RuleFailure::expected("number", other)),
            },
            RuleKind::Boolean => match raw {
                Value::Bool(b) => Ok(Decoded::Bool(*b)),
                other => Err(RuleFailure::expected("bool", other)),
            },
            RuleKind::List(element) => match raw {
                Value::Array(items) => {
                    let mut accepted = Vec::with_capacity(items.len());
                    let mut failures = Vec::new();
                    for (index, item) in items.iter().enumerate() {
                        match element.check(item, decoder) {
                            Ok(value) => accepted.push(value),
                            Err(RuleFailure::Fatal(err)) => {
                                return Err(RuleFailure::Fatal(err));
                            }
                            Err(RuleFailure::Message(msg)) => {
                                failures.push((format!("[{index}]"), msg));
                            }
                            Err(RuleFailure::Elements(nested)) => {
                                for (suffix, msg) in nested {
                                    failures.push((format!("[{index}]{suffix}"), msg));
                                }
                            }
                        }
                    }
                    if failures.is_empty() {
                        Ok(Decoded::List(accepted))
                    } else {
                        Err(RuleFailure::Elements(failures))
                    }
                }
                other => Err(RuleFailure::expected("list", other)),
            },
            RuleKind::EnsureType(tag) => {
                // Decode first, then check; see rule docs for the ordering.
                let decoded = match decoder.decode_value(raw) {
                    Ok(value) => value,
                    Err(err) if err.is_client_error() => {
                        return Err(RuleFailure::message(err.to_string()));
                    }
                    Err(err) => return Err(RuleFailure::Fatal(err)),
                };
                let actual = decoder.kind_of(&decoded);
                match &decoded {
                    Decoded::Object(_) if actual == *tag => Ok(decoded),
                    _ => Err(RuleFailure::message(format!(
                        "Expected {tag} got {actual} instead."
                    ))),
                }
            }
        }
    }
}

enum RuleFailure {
    /// Field-scoped message.
    Message(String),
    /// Per-element messages for list rules, keyed by `[index]` suffix.
    Elements(Vec<(String, String)>),
    /// Not a validation outcome; propagates unchanged (builder defects etc).
    Fatal(crate::error::CodecError),
}

impl RuleFailure {
    fn message(msg: impl Into<String>) -> Self {
        RuleFailure::Message(msg.into())
    }

    fn expected(expected: &str, raw: &Value) -> Self {
        RuleFailure::Message(format!(
            "Expected {expected} got {} instead.",
            json_kind(raw)
        ))
    }
}

/// Ordered set of field rules for one wire type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<(String, FieldRule)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a rule. Declaration order fixes error-report order.
    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate the raw fields of a tagged object (reserved key excluded).
    ///
    /// Returns the accepted values, already decoded, for every declared field
    /// that was present — or a [`ValidationError`] aggregating every failed
    /// field. Undeclared fields are not inspected here; the decoder recurses
    /// into them separately.
    pub(crate) fn validate(
        &self,
        tag: &str,
        raw: &Map<String, Value>,
        decoder: &Decoder<'_>,
    ) -> CodecResult<FieldMap> {
        let mut clean = FieldMap::new();
        let mut errors: IndexMap<String, String> = IndexMap::new();
        for (name, rule) in &self.fields {
            match raw.get(name) {
                None => {
                    if !rule.optional {
                        errors.insert(name.clone(), "This field is required.".to_string());
                    }
                }
                Some(value) => match rule.check(value, decoder) {
                    Ok(decoded) => {
                        clean.insert(name.clone(), decoded);
                    }
                    Err(RuleFailure::Message(msg)) => {
                        errors.insert(name.clone(), msg);
                    }
                    Err(RuleFailure::Elements(failures)) => {
                        for (suffix, msg) in failures {
                            errors.insert(format!("{name}{suffix}"), msg);
                        }
                    }
                    Err(RuleFailure::Fatal(err)) => return Err(err),
                },
            }
        }
        if errors.is_empty() {
            Ok(clean)
        } else {
            Err(ValidationError::for_object(tag, errors).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodecError;
    use crate::registry::{Registry, WireObject, WireType};
    use crate::value::FieldAccess;
    use serde_json::json;
    use std::any::Any;

    #[derive(Debug, Clone)]
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

    fn registry_with_color() -> Registry {
        let registry = Registry::new();
        registry
            .register(WireType::new("Color", |mut fields: FieldMap| {
                Ok(Color {
                    name: fields.take_string("name")?,
                })
            }))
            .unwrap();
        registry
    }

    fn validate(
        schema: &Schema,
        registry: &Registry,
        raw: Value,
    ) -> CodecResult<FieldMap> {
        let decoder = Decoder::new(registry);
        let map = raw.as_object().expect("object fixture").clone();
        schema.validate("Person", &map, &decoder)
    }

    fn fields_of(err: CodecError) -> IndexMap<String, String> {
        match err {
            CodecError::Validation(v) => v.fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn string_rule_accepts_and_rejects() {
        let registry = Registry::new();
        let schema = Schema::new().field("first_name", FieldRule::string());

        let ok = validate(&schema, &registry, json!({"first_name": "bob"})).unwrap();
        assert_eq!(ok["first_name"], Decoded::from("bob"));

        let fields = fields_of(
            validate(&schema, &registry, json!({"first_name": 1})).unwrap_err(),
        );
        assert_eq!(fields["first_name"], "Expected str got int instead.");
    }

    #[test]
    fn string_max_length() {
        let registry = Registry::new();
        let schema = Schema::new().field("name", FieldRule::string_max(3));
        let fields =
            fields_of(validate(&schema, &registry, json!({"name": "toolong"})).unwrap_err());
        assert_eq!(fields["name"], "String exceeds max length of 3.");
    }

    #[test]
    fn scalar_rules() {
        let registry = Registry::new();
        let schema = Schema::new()
            .field("age", FieldRule::integer())
            .field("height", FieldRule::float())
            .field("score", FieldRule::number())
            .field("alive", FieldRule::boolean());

        let ok = validate(
            &schema,
            &registry,
            json!({"age": 40, "height": 1.8, "score": 7, "alive": true}),
        )
        .unwrap();
        assert_eq!(ok["age"], Decoded::from(40i64));
        assert_eq!(ok["alive"], Decoded::from(true));
        // number() takes either numeric kind.
        assert_eq!(ok["score"], Decoded::from(7i64));

        let fields = fields_of(
            validate(
                &schema,
                &registry,
                json!({"age": 1.5, "height": 2, "score": "7", "alive": "yes"}),
            )
            .unwrap_err(),
        );
        assert_eq!(fields["age"], "Expected int got float instead.");
        assert_eq!(fields["height"], "Expected float got int instead.");
        assert_eq!(fields["score"], "Expected number got str instead.");
        assert_eq!(fields["alive"], "Expected bool got str instead.");
    }

    #[test]
    fn missing_required_field() {
        let registry = Registry::new();
        let schema = Schema::new().field("first_name", FieldRule::string());
        let fields = fields_of(validate(&schema, &registry, json!({})).unwrap_err());
        assert_eq!(fields["first_name"], "This field is required.");
    }

    #[test]
    fn optional_field_may_be_absent() {
        let registry = Registry::new();
        let schema = Schema::new().field("nickname", FieldRule::string().optional());
        assert!(validate(&schema, &registry, json!({})).unwrap().is_empty());

        // Present values are still checked.
        let fields =
            fields_of(validate(&schema, &registry, json!({"nickname": 7})).unwrap_err());
        assert_eq!(fields["nickname"], "Expected str got int instead.");
    }

    #[test]
    fn all_failures_reported_in_declaration_order() {
        let registry = Registry::new();
        let schema = Schema::new()
            .field("first_name", FieldRule::string())
            .field("last_name", FieldRule::string());
        let fields = fields_of(
            validate(
                &schema,
                &registry,
                json!({"first_name": 1, "last_name": 2}),
            )
            .unwrap_err(),
        );
        let keys: Vec<_> = fields.keys().cloned().collect();
        assert_eq!(keys, vec!["first_name", "last_name"]);
    }

    #[test]
    fn list_rule_indexes_element_failures() {
        let registry = Registry::new();
        let schema = Schema::new().field("tags", FieldRule::list(FieldRule::string()));

        let ok = validate(&schema, &registry, json!({"tags": ["a", "b"]})).unwrap();
        assert_eq!(ok["tags"], Decoded::from(vec!["a", "b"]));

        let fields = fields_of(
            validate(&schema, &registry, json!({"tags": ["a", 2, null]})).unwrap_err(),
        );
        assert_eq!(fields["tags[1]"], "Expected str got int instead.");
        assert_eq!(fields["tags[2]"], "Expected str got null instead.");
        assert!(!fields.contains_key("tags[0]"));
    }

    #[test]
    fn ensure_type_accepts_registered_instances() {
        let registry = registry_with_color();
        let schema = Schema::new().field("color", FieldRule::ensure_type("Color"));
        let ok = validate(
            &schema,
            &registry,
            json!({"color": {"__type__": "Color", "name": "red"}}),
        )
        .unwrap();
        assert!(matches!(ok["color"], Decoded::Object(_)));
    }

    #[test]
    fn ensure_type_rejects_plain_dict_after_decoding() {
        let registry = registry_with_color();
        let schema = Schema::new().field("color", FieldRule::ensure_type("Color"));
        let fields = fields_of(
            validate(&schema, &registry, json!({"color": {"name": "red"}})).unwrap_err(),
        );
        assert_eq!(fields["color"], "Expected Color got dict instead.");
    }

    #[test]
    fn list_of_ensure_type() {
        let registry = registry_with_color();
        let schema = Schema::new().field(
            "colors",
            FieldRule::list(FieldRule::ensure_type("Color")),
        );
        let fields = fields_of(
            validate(
                &schema,
                &registry,
                json!({"colors": [{"__type__": "Color", "name": "red"}, 5]}),
            )
            .unwrap_err(),
        );
        assert_eq!(fields["colors[1]"], "Expected Color got int instead.");
    }
}
