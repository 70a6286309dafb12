//! Two-stage construction of a [`Registry`]: declare message shapes (in any
//! order, including cyclically), populate their fields, then freeze
//! everything at once.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::error::SchemaError;
use crate::extension::{Extensions, ExtensionMarker};
use crate::registry::{MessageDef, MessageFieldDef, Registry};
use crate::types::DataType;

/// A field to add to a message definition under construction.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub data_type: DataType,
    pub tag: u32,
    pub repeated: bool,
    pub extensions: Extensions,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, data_type: DataType, tag: u32) -> Self {
        FieldSpec {
            name: name.into(),
            data_type,
            tag,
            repeated: false,
            extensions: Extensions::new(),
        }
    }

    pub fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Attaches a codec-specific extension value to this field, e.g. the
    /// protobuf codec's `IntegerEncoding` marker.
    pub fn with_extension<T: std::any::Any + Send + Sync>(
        mut self,
        marker: ExtensionMarker,
        value: T,
    ) -> Self {
        self.extensions.set(marker, value);
        self
    }
}

struct Draft {
    namespace: String,
    name: String,
    fields: Vec<FieldSpec>,
}

impl Draft {
    fn empty() -> Self {
        Draft {
            namespace: String::new(),
            name: String::new(),
            fields: Vec::new(),
        }
    }
}

/// Builds a [`Registry`] from message shapes declared under caller-chosen
/// keys of type `K` — typically `&'static str`, but any hashable, clonable
/// token works, which lets forward references resolve before the
/// referenced definition's fields exist yet.
pub struct RegistryBuilder<K: Eq + Hash + Clone> {
    keys: HashMap<K, usize>,
    drafts: Vec<Option<Draft>>,
}

impl<K: Eq + Hash + Clone> Default for RegistryBuilder<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> RegistryBuilder<K> {
    pub fn new() -> Self {
        RegistryBuilder {
            keys: HashMap::new(),
            drafts: Vec::new(),
        }
    }

    /// Declares (or looks up) the message definition keyed by `key`,
    /// returning the [`DataType`] that refers to it.
    ///
    /// Safe to call before `key`'s own fields are populated with
    /// [`RegistryBuilder::message_def`] — this is how two message
    /// definitions can reference each other cyclically: each side only
    /// needs the other's `DataType`, not its finished field list.
    pub fn for_message_def(&mut self, key: K) -> DataType {
        let index = match self.keys.get(&key) {
            Some(&i) => i,
            None => {
                let i = self.drafts.len();
                self.drafts.push(None);
                self.keys.insert(key, i);
                i
            }
        };
        DataType::entity(index as u32)
    }

    /// Returns a handle for incrementally populating the definition at
    /// `key`. `key` need not have been declared yet — this declares it if
    /// necessary, same as [`RegistryBuilder::for_message_def`].
    pub fn message_def(&mut self, key: K) -> MessageDefBuilder<'_, K> {
        self.for_message_def(key.clone());
        let index = self.keys[&key];
        if self.drafts[index].is_none() {
            self.drafts[index] = Some(Draft::empty());
        }
        MessageDefBuilder {
            registry: self,
            index,
        }
    }

    /// Freezes every declared definition: sorts each one's fields by tag,
    /// assigns storage offsets, and validates there are no duplicate tags
    /// or names.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IncompleteRegistry`] if any key returned by
    /// [`RegistryBuilder::for_message_def`] was never given a name and
    /// fields via [`RegistryBuilder::message_def`]; returns
    /// [`SchemaError::DuplicateTag`]/[`SchemaError::DuplicateName`]/
    /// [`SchemaError::ZeroTag`] if a definition's fields don't form a valid
    /// shape.
    pub fn build(self) -> Result<Registry, SchemaError> {
        let missing = self.drafts.iter().filter(|d| d.is_none()).count();
        if missing > 0 {
            return Err(SchemaError::IncompleteRegistry { missing });
        }

        let defs = self
            .drafts
            .into_iter()
            .map(|d| freeze(d.expect("checked above")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Registry { defs })
    }
}

fn freeze(draft: Draft) -> Result<MessageDef, SchemaError> {
    let mut fields = draft.fields;
    fields.sort_by_key(|f| f.tag);

    let mut seen_tags = HashSet::with_capacity(fields.len());
    let mut seen_names = HashSet::with_capacity(fields.len());
    for f in &fields {
        if f.tag == 0 {
            return Err(SchemaError::ZeroTag);
        }
        if !seen_tags.insert(f.tag) {
            return Err(SchemaError::DuplicateTag {
                message: draft.name.clone(),
                tag: f.tag,
            });
        }
        if !seen_names.insert(f.name.clone()) {
            return Err(SchemaError::DuplicateName {
                message: draft.name.clone(),
                name: f.name.clone(),
            });
        }
    }

    let mut data_length = 0usize;
    let mut entities_length = 0usize;
    let mut out_fields = Vec::with_capacity(fields.len());
    for f in fields {
        let offset = if f.repeated || f.data_type.is_ref_type() {
            let offset = entities_length;
            entities_length += 1;
            offset
        } else {
            let offset = data_length;
            data_length += f.data_type.width_in_bytes();
            offset
        };
        out_fields.push(MessageFieldDef {
            name: f.name,
            data_type: f.data_type,
            tag: f.tag,
            repeated: f.repeated,
            offset,
            extensions: f.extensions,
        });
    }

    Ok(MessageDef {
        namespace: draft.namespace,
        name: draft.name,
        fields: out_fields.into_boxed_slice(),
        data_length,
        entities_length,
    })
}

/// Handle for populating one message definition's namespace, name, and
/// fields. Returned by [`RegistryBuilder::message_def`]; each setter
/// consumes and returns `self` to support chaining.
pub struct MessageDefBuilder<'a, K: Eq + Hash + Clone> {
    registry: &'a mut RegistryBuilder<K>,
    index: usize,
}

impl<'a, K: Eq + Hash + Clone> MessageDefBuilder<'a, K> {
    fn draft_mut(&mut self) -> &mut Draft {
        self.registry.drafts[self.index]
            .as_mut()
            .expect("draft was initialized by RegistryBuilder::message_def")
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.draft_mut().namespace = namespace.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.draft_mut().name = name.into();
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.draft_mut().fields.push(field);
        self
    }

    /// The `DataType` referring to this definition, usable immediately in
    /// other fields even before this builder is dropped.
    pub fn data_type(&self) -> DataType {
        DataType::entity(self.index as u32)
    }
}
