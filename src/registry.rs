//! Frozen schema types produced by [`crate::builder::RegistryBuilder`].

use crate::extension::Extensions;
use crate::types::DataType;

/// One field of a [`MessageDef`].
///
/// `offset` is dual-purpose, matching whichever storage area the field's
/// [`DataType`] uses in an [`crate::entity::Entity`]:
/// * Value-typed, non-repeated fields: a byte offset into the entity's
///   packed data buffer.
/// * Reference-typed or repeated fields of any kind: an index into the
///   entity's reference-slot array.
#[derive(Debug, Clone)]
pub struct MessageFieldDef {
    pub name: String,
    pub data_type: DataType,
    pub tag: u32,
    pub repeated: bool,
    pub offset: usize,
    /// Codec-specific hints attached at schema-build time, e.g. the
    /// protobuf codec's zigzag-vs-varint integer encoding choice. See
    /// [`crate::extension`].
    pub extensions: Extensions,
}

impl MessageFieldDef {
    /// True if this field is stored in the entity's reference-slot array
    /// rather than inline in its packed data buffer — either because the
    /// field's type is itself a reference ([`DataType::is_ref_type`]), or
    /// because it's repeated (repeated fields always go through an
    /// indirection entity, even for packed primitive elements).
    pub fn uses_reference_slot(&self) -> bool {
        self.repeated || self.data_type.is_ref_type()
    }
}

/// A runtime-declared message shape: a namespace-qualified name plus a
/// tag-sorted list of fields.
#[derive(Debug, Clone)]
pub struct MessageDef {
    pub namespace: String,
    pub name: String,
    pub(crate) fields: Box<[MessageFieldDef]>,
    pub(crate) data_length: usize,
    pub(crate) entities_length: usize,
}

impl MessageDef {
    /// Fields in ascending tag order.
    pub fn fields(&self) -> &[MessageFieldDef] {
        &self.fields
    }

    /// Total width, in bytes, of the packed data buffer a fresh
    /// [`crate::entity::Entity`] of this shape must allocate.
    pub fn data_length(&self) -> usize {
        self.data_length
    }

    /// Number of reference slots a fresh [`crate::entity::Entity`] of this
    /// shape must allocate.
    pub fn entities_length(&self) -> usize {
        self.entities_length
    }

    /// The fully-qualified name, `namespace.name`, or just `name` when the
    /// namespace is empty.
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// Looks up a field by its wire tag via binary search — fields are
    /// kept sorted by tag for exactly this purpose.
    pub fn field_by_tag(&self, tag: u32) -> Option<&MessageFieldDef> {
        self.fields
            .binary_search_by_key(&tag, |f| f.tag)
            .ok()
            .map(|i| &self.fields[i])
    }

    /// Looks up a field by its JSON member name.
    pub fn field_by_name(&self, name: &str) -> Option<&MessageFieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A frozen, immutable collection of [`MessageDef`]s that may reference
/// each other (including cyclically) by index.
///
/// `Registry` is `Send + Sync`: once built, it is never mutated again, so
/// it may be shared freely across threads. The [`crate::entity::Entity`]
/// instances built against it are not — see the entity module's doc
/// comment.
#[derive(Debug, Clone)]
pub struct Registry {
    pub(crate) defs: Vec<MessageDef>,
}

impl Registry {
    /// Returns the message definition at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range. A valid `DataType::entity(index)`
    /// value produced against this same registry never panics here — this
    /// is a programmer error, not a schema or data error.
    pub fn get(&self, index: u32) -> &MessageDef {
        &self.defs[index as usize]
    }

    /// Resolves the message definition an entity-reference field's
    /// [`DataType`] points to.
    ///
    /// # Panics
    ///
    /// Panics if `data_type` is not an entity-reference type, or its index
    /// is out of range for this registry.
    pub fn resolve(&self, data_type: DataType) -> &MessageDef {
        self.get(data_type.entity_index())
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
