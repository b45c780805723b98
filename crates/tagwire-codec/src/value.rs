//! Decoded value model.
//!
//! [`Decoded`] is the tree produced by the decoder and consumed by the
//! encoder: JSON scalars, ordered lists and maps, plus [`Instance`] for
//! objects that resolved against the registry. Field maps are
//! insertion-ordered, which is what makes encoding deterministic.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Number, Value};

use crate::error::BuildError;
use crate::registry::WireObject;

/// Ordered field-name → value map.
pub type FieldMap = IndexMap<String, Decoded>;

/// A decoded JSON value, possibly containing typed instances.
#[derive(Debug, Clone)]
pub enum Decoded {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Decoded>),
    /// An object without the reserved type key: ordered, untyped, unvalidated.
    Map(FieldMap),
    /// A tagged object after successful resolution and construction.
    Object(Instance),
}

impl Decoded {
    /// Wrap a built wire object.
    pub fn object<T: WireObject>(value: T) -> Self {
        Decoded::Object(Instance::new(value))
    }

    /// Wire-level kind name used in diagnostics. Typed instances report
    /// `"object"` here; the decoder substitutes the registered tag where one
    /// is known.
    pub fn kind(&self) -> &'static str {
        match self {
            Decoded::Null => "null",
            Decoded::Bool(_) => "bool",
            Decoded::Number(n) if n.is_f64() => "float",
            Decoded::Number(_) => "int",
            Decoded::String(_) => "str",
            Decoded::List(_) => "list",
            Decoded::Map(_) => "dict",
            Decoded::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Decoded::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Decoded::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Decoded::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Decoded::Object(inst) => Some(inst),
            _ => None,
        }
    }
}

/// Structural equality: typed instances are equal when they are the same
/// runtime type and export equal field maps, recursively.
impl PartialEq for Decoded {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Decoded::Null, Decoded::Null) => true,
            (Decoded::Bool(a), Decoded::Bool(b)) => a == b,
            (Decoded::Number(a), Decoded::Number(b)) => a == b,
            (Decoded::String(a), Decoded::String(b)) => a == b,
            (Decoded::List(a), Decoded::List(b)) => a == b,
            (Decoded::Map(a), Decoded::Map(b)) => a == b,
            (Decoded::Object(a), Decoded::Object(b)) => a == b,
            _ => false,
        }
    }
}

/// Shared handle around a built wire object.
///
/// Instances are transient, scoped to a single decode/encode sequence; the
/// `Arc` exists so nested instances can appear in several field maps without
/// deep copies.
#[derive(Clone)]
pub struct Instance {
    object: Arc<dyn WireObject>,
    type_name: &'static str,
}

impl Instance {
    pub fn new<T: WireObject>(value: T) -> Self {
        Self {
            object: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Runtime identity used for reverse tag resolution.
    pub fn type_id(&self) -> TypeId {
        self.object.as_any().type_id()
    }

    /// Rust type name, for encode-time diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: WireObject>(&self) -> bool {
        self.object.as_any().is::<T>()
    }

    pub fn downcast_ref<T: WireObject>(&self) -> Option<&T> {
        self.object.as_any().downcast_ref::<T>()
    }

    /// Exported fields in declaration order, suppressed fields included.
    /// Suppression is applied by the encoder, not here.
    pub fn wire_fields(&self) -> FieldMap {
        self.object.wire_fields()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.object.fmt(f)
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id() && self.wire_fields() == other.wire_fields()
    }
}

impl From<Instance> for Decoded {
    fn from(inst: Instance) -> Self {
        Decoded::Object(inst)
    }
}

impl From<bool> for Decoded {
    fn from(b: bool) -> Self {
        Decoded::Bool(b)
    }
}

impl From<i32> for Decoded {
    fn from(n: i32) -> Self {
        Decoded::Number(Number::from(n))
    }
}

impl From<i64> for Decoded {
    fn from(n: i64) -> Self {
        Decoded::Number(Number::from(n))
    }
}

impl From<u64> for Decoded {
    fn from(n: u64) -> Self {
        Decoded::Number(Number::from(n))
    }
}

impl From<f64> for Decoded {
    fn from(n: f64) -> Self {
        Number::from_f64(n).map(Decoded::Number).unwrap_or(Decoded::Null)
    }
}

impl From<&str> for Decoded {
    fn from(s: &str) -> Self {
        Decoded::String(s.to_string())
    }
}

impl From<String> for Decoded {
    fn from(s: String) -> Self {
        Decoded::String(s)
    }
}

impl<T: Into<Decoded>> From<Vec<T>> for Decoded {
    fn from(items: Vec<T>) -> Self {
        Decoded::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Decoded>> From<Option<T>> for Decoded {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Decoded::Null)
    }
}

/// Wire-level kind name of a raw JSON value.
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Typed field extraction for builders.
///
/// Each `take_*` removes the field from the map and converts it, returning a
/// [`BuildError`] on absence or kind mismatch so builder closures stay short.
pub trait FieldAccess {
    fn take(&mut self, name: &str) -> Result<Decoded, BuildError>;
    fn take_string(&mut self, name: &str) -> Result<String, BuildError>;
    fn take_i64(&mut self, name: &str) -> Result<i64, BuildError>;
    fn take_f64(&mut self, name: &str) -> Result<f64, BuildError>;
    fn take_bool(&mut self, name: &str) -> Result<bool, BuildError>;
    fn take_list(&mut self, name: &str) -> Result<Vec<Decoded>, BuildError>;
    /// Extract a nested typed instance as a concrete `T`.
    fn take_object<T: WireObject + Clone>(&mut self, name: &str) -> Result<T, BuildError>;
    /// Extract a list of nested typed instances as concrete `T`s.
    fn take_objects<T: WireObject + Clone>(&mut self, name: &str) -> Result<Vec<T>, BuildError>;
    /// Like [`FieldAccess::take_string`], but absence and null yield `None`.
    fn take_opt_string(&mut self, name: &str) -> Result<Option<String>, BuildError>;
}

impl FieldAccess for FieldMap {
    fn take(&mut self, name: &str) -> Result<Decoded, BuildError> {
        self.shift_remove(name)
            .ok_or_else(|| BuildError::missing_field(name))
    }

    fn take_string(&mut self, name: &str) -> Result<String, BuildError> {
        match self.take(name)? {
            Decoded::String(s) => Ok(s),
            other => Err(BuildError::wrong_kind(name, "str", other.kind())),
        }
    }

    fn take_i64(&mut self, name: &str) -> Result<i64, BuildError> {
        let value = self.take(name)?;
        value
            .as_i64()
            .ok_or_else(|| BuildError::wrong_kind(name, "int", value.kind()))
    }

    fn take_f64(&mut self, name: &str) -> Result<f64, BuildError> {
        // Strictly float, like the float rule: integers are not coerced.
        match self.take(name)? {
            Decoded::Number(n) if n.is_f64() => Ok(n.as_f64().unwrap_or_default()),
            other => Err(BuildError::wrong_kind(name, "float", other.kind())),
        }
    }

    fn take_bool(&mut self, name: &str) -> Result<bool, BuildError> {
        let value = self.take(name)?;
        value
            .as_bool()
            .ok_or_else(|| BuildError::wrong_kind(name, "bool", value.kind()))
    }

    fn take_list(&mut self, name: &str) -> Result<Vec<Decoded>, BuildError> {
        match self.take(name)? {
            Decoded::List(items) => Ok(items),
            other => Err(BuildError::wrong_kind(name, "list", other.kind())),
        }
    }

    fn take_object<T: WireObject + Clone>(&mut self, name: &str) -> Result<T, BuildError> {
        match self.take(name)? {
            Decoded::Object(inst) => inst.downcast_ref::<T>().cloned().ok_or_else(|| {
                BuildError::wrong_kind(name, std::any::type_name::<T>(), inst.type_name())
            }),
            other => {
                Err(BuildError::wrong_kind(name, std::any::type_name::<T>(), other.kind()))
            }
        }
    }

    fn take_objects<T: WireObject + Clone>(&mut self, name: &str) -> Result<Vec<T>, BuildError> {
        let items = self.take_list(name)?;
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Decoded::Object(inst) => match inst.downcast_ref::<T>() {
                    Some(value) => out.push(value.clone()),
                    None => {
                        return Err(BuildError::wrong_kind(
                            &format!("{name}[{index}]"),
                            std::any::type_name::<T>(),
                            inst.type_name(),
                        ));
                    }
                },
                other => {
                    return Err(BuildError::wrong_kind(
                        &format!("{name}[{index}]"),
                        std::any::type_name::<T>(),
                        other.kind(),
                    ));
                }
            }
        }
        Ok(out)
    }

    fn take_opt_string(&mut self, name: &str) -> Result<Option<String>, BuildError> {
        match self.shift_remove(name) {
            None | Some(Decoded::Null) => Ok(None),
            Some(Decoded::String(s)) => Ok(Some(s)),
            Some(other) => Err(BuildError::wrong_kind(name, "str", other.kind())),
        }
    }
}
