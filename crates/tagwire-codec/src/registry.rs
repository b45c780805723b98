//! Wire type registry.
//!
//! The registry is the single shared-state component: a mapping from type tag
//! to descriptor, plus the reverse mapping from Rust runtime type to tag used
//! by the encoder. It has an explicit lifecycle — populate at startup (or in
//! test setup), [`Registry::clear`] in teardown — and every lookup observes
//! an atomic snapshot relative to mutation.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{BuildError, CodecError, CodecResult, DecodeError};
use crate::schema::Schema;
use crate::value::{FieldMap, Instance};

/// Capability pair every wire type implements: build happens through the
/// registered builder closure, and [`WireObject::wire_fields`] exposes the
/// field map for encoding.
pub trait WireObject: Any + Send + Sync + fmt::Debug {
    /// Exported fields in declaration order. Include suppressed fields; the
    /// encoder drops them against the descriptor.
    fn wire_fields(&self) -> FieldMap;

    fn as_any(&self) -> &dyn Any;
}

type Builder = Arc<dyn Fn(FieldMap) -> Result<Instance, BuildError> + Send + Sync>;

/// Declarative registration of one wire type: tag, builder, optional schema,
/// suppressed fields.
///
/// ```
/// # use tagwire_codec::{Decoded, FieldAccess, FieldMap, Registry, Schema, FieldRule, WireType, WireObject};
/// # use std::any::Any;
/// #[derive(Debug, Clone)]
/// struct Color { name: String }
///
/// impl WireObject for Color {
///     fn wire_fields(&self) -> FieldMap {
///         FieldMap::from([("name".to_string(), Decoded::from(self.name.clone()))])
///     }
///     fn as_any(&self) -> &dyn Any { self }
/// }
///
/// let registry = Registry::new();
/// registry
///     .register(
///         WireType::new("Color", |mut fields: FieldMap| {
///             Ok(Color { name: fields.take_string("name")? })
///         })
///         .with_schema(Schema::new().field("name", FieldRule::string())),
///     )
///     .unwrap();
/// ```
pub struct WireType<T> {
    tag: String,
    builder: Builder,
    schema: Option<Schema>,
    suppressed: HashSet<String>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: WireObject> WireType<T> {
    pub fn new<F>(tag: impl Into<String>, build: F) -> Self
    where
        F: Fn(FieldMap) -> Result<T, BuildError> + Send + Sync + 'static,
    {
        Self {
            tag: tag.into(),
            builder: Arc::new(move |fields| build(fields).map(Instance::new)),
            schema: None,
            suppressed: HashSet::new(),
            _marker: PhantomData,
        }
    }

    /// Bind a validation schema. Types without one decode unvalidated.
    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Exclude a field from encoded output. For fields that are not
    /// serializable by nature, e.g. internal storage handles.
    pub fn suppress(mut self, field: impl Into<String>) -> Self {
        self.suppressed.insert(field.into());
        self
    }
}

/// Immutable registration record for one wire type.
pub struct WireTypeDescriptor {
    pub(crate) tag: String,
    pub(crate) type_id: TypeId,
    pub(crate) builder: Builder,
    pub(crate) schema: Option<Schema>,
    pub(crate) suppressed: HashSet<String>,
}

impl WireTypeDescriptor {
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for WireTypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireTypeDescriptor")
            .field("tag", &self.tag)
            .field("schema", &self.schema.is_some())
            .field("suppressed", &self.suppressed)
            .finish()
    }
}

#[derive(Default)]
struct Tables {
    by_tag: HashMap<String, Arc<WireTypeDescriptor>>,
    by_type: HashMap<TypeId, String>,
}

/// Process-wide mapping from type tag to wire type descriptor.
///
/// Registration policy: a live tag (or an already-bound Rust type) is
/// rejected with [`CodecError::DuplicateTag`] — re-registration requires an
/// explicit [`Registry::clear`] first. Mutation is serialized against lookups
/// by the inner lock; intended mutation points are service startup and test
/// setup/teardown, never concurrent with in-flight decodes.
#[derive(Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: WireObject>(&self, wire_type: WireType<T>) -> CodecResult<()> {
        let mut tables = self.tables.write();
        if tables.by_tag.contains_key(&wire_type.tag) {
            return Err(CodecError::DuplicateTag(wire_type.tag));
        }
        let type_id = TypeId::of::<T>();
        if let Some(existing) = tables.by_type.get(&type_id) {
            // One tag per Rust type; reverse resolution must be unambiguous.
            return Err(CodecError::DuplicateTag(existing.clone()));
        }
        let descriptor = Arc::new(WireTypeDescriptor {
            tag: wire_type.tag.clone(),
            type_id,
            builder: wire_type.builder,
            schema: wire_type.schema,
            suppressed: wire_type.suppressed,
        });
        tables.by_type.insert(type_id, wire_type.tag.clone());
        tables.by_tag.insert(wire_type.tag, descriptor);
        Ok(())
    }

    pub(crate) fn resolve(&self, tag: &str) -> Result<Arc<WireTypeDescriptor>, DecodeError> {
        self.tables
            .read()
            .by_tag
            .get(tag)
            .cloned()
            .ok_or_else(|| DecodeError::UnknownType(tag.to_string()))
    }

    pub(crate) fn reverse_resolve(&self, type_id: TypeId) -> Option<Arc<WireTypeDescriptor>> {
        let tables = self.tables.read();
        let tag = tables.by_type.get(&type_id)?;
        tables.by_tag.get(tag).cloned()
    }

    /// Tag bound to a built instance's runtime type, if any.
    pub fn tag_of(&self, instance: &Instance) -> Option<String> {
        self.tables
            .read()
            .by_type
            .get(&instance.type_id())
            .cloned()
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.tables.read().by_tag.contains_key(tag)
    }

    /// Remove every entry. For test isolation and explicit teardown.
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_tag.clear();
        tables.by_type.clear();
    }

    pub fn len(&self) -> usize {
        self.tables.read().by_tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("Registry")
            .field("tags", &tables.by_tag.keys().collect::<Vec<_>>())
            .finish()
    }
}
