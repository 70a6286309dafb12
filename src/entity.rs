//! In-memory instances built against a [`crate::registry::MessageDef`].

use crate::error::AccessError;
use crate::extension::Extensions;
use crate::primitive::Primitive;
use crate::registry::{MessageDef, MessageFieldDef};

/// An instance of some [`MessageDef`].
///
/// Storage is split in two, mirroring the field kinds a schema can
/// describe:
/// * `data` is a packed byte buffer holding every inline value-typed field
///   (and, for a field acting as a *container* for a repeated primitive,
///   the packed run of that field's elements).
/// * `entities` is an array of optional child entities, one slot per
///   reference-typed or repeated field, holding either the referenced
///   entity directly (non-repeated) or a container entity whose own
///   `data`/`entities` hold the repeated elements (see
///   [`MessageFieldDef::reserve`]).
///
/// `Entity` trees are exclusively owned — there is no shared mutable
/// state to synchronize, so the type carries no `Send`/`Sync` bound of
/// its own beyond what `Vec`/`Box` already provide, and callers build,
/// read, and discard one instance at a time.
#[derive(Debug, Clone, Default)]
pub struct Entity {
    pub(crate) data: Vec<u8>,
    pub(crate) entities: Vec<Option<Box<Entity>>>,
}

impl Entity {
    /// Allocates a fresh, zeroed instance of `def`'s shape.
    pub fn new(def: &MessageDef) -> Self {
        Entity {
            data: vec![0u8; def.data_length()],
            entities: (0..def.entities_length()).map(|_| None).collect(),
        }
    }

    /// Builds a leaf entity whose data buffer holds `bytes` directly —
    /// used for `String`/`Bytes` fields, whose contents aren't further
    /// decomposed into fields.
    pub fn leaf(bytes: Vec<u8>) -> Self {
        Entity {
            data: bytes,
            entities: Vec::new(),
        }
    }

    /// The raw bytes of a leaf entity built via [`Entity::leaf`].
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// The raw bytes of a leaf entity, interpreted as UTF-8.
    ///
    /// # Panics
    ///
    /// Panics if the bytes are not valid UTF-8. Entities produced by this
    /// crate's codecs only ever hold validated UTF-8 in a `String` field's
    /// leaf, so this only panics on a hand-built entity with invalid
    /// content.
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.data).expect("entity bytes are not valid utf-8")
    }
}

/// A borrowed, possibly-null view of a reference-typed field's target.
#[derive(Debug, Clone, Copy)]
pub struct Reference<'a>(pub Option<&'a Entity>);

impl<'a> Reference<'a> {
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    pub fn entity(&self) -> Option<&'a Entity> {
        self.0
    }
}

#[inline]
fn read_primitive(data: &[u8], offset: usize, width: usize) -> Primitive {
    match width {
        1 => Primitive::from_u64(u64::from(data[offset])),
        4 => {
            let bytes: [u8; 4] = data[offset..offset + 4].try_into().unwrap();
            Primitive::from_u64(u64::from(u32::from_ne_bytes(bytes)))
        }
        8 => {
            let bytes: [u8; 8] = data[offset..offset + 8].try_into().unwrap();
            Primitive::from_u64(u64::from_ne_bytes(bytes))
        }
        other => panic!("unexpected field width: {other}"),
    }
}

#[inline]
fn write_primitive(data: &mut [u8], offset: usize, width: usize, value: Primitive) {
    match width {
        1 => data[offset] = value.to_u64() as u8,
        4 => {
            let bytes = (value.to_u64() as u32).to_ne_bytes();
            data[offset..offset + 4].copy_from_slice(&bytes);
        }
        8 => {
            let bytes = value.to_u64().to_ne_bytes();
            data[offset..offset + 8].copy_from_slice(&bytes);
        }
        other => panic!("unexpected field width: {other}"),
    }
}

impl MessageFieldDef {
    /// Reads a non-repeated, value-typed field.
    ///
    /// # Panics
    ///
    /// Panics if this field is repeated or reference-typed — use
    /// [`MessageFieldDef::get_reference`] or
    /// [`MessageFieldDef::get_primitive_at`] instead.
    pub fn get_primitive(&self, e: &Entity) -> Primitive {
        debug_assert!(!self.uses_reference_slot());
        read_primitive(&e.data, self.offset, self.data_type.width_in_bytes())
    }

    /// Writes a non-repeated, value-typed field.
    pub fn set_primitive(&self, e: &mut Entity, value: Primitive) {
        debug_assert!(!self.uses_reference_slot());
        write_primitive(&mut e.data, self.offset, self.data_type.width_in_bytes(), value);
    }

    /// Reads a non-repeated, reference-typed field.
    pub fn get_reference<'a>(&self, e: &'a Entity) -> Reference<'a> {
        debug_assert!(self.data_type.is_ref_type() && !self.repeated);
        Reference(e.entities[self.offset].as_deref())
    }

    /// Writes a non-repeated, reference-typed field. `None` clears it.
    pub fn set_reference(&self, e: &mut Entity, value: Option<Entity>) {
        debug_assert!(self.data_type.is_ref_type() && !self.repeated);
        e.entities[self.offset] = value.map(Box::new);
    }

    /// Reads the `n`th element of a repeated, value-typed field.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::IndexOutOfRange`] if `n` is out of range for
    /// the field's reserved length (0 if no room was ever
    /// [`MessageFieldDef::reserve`]d) — this is a recoverable data error,
    /// not a programmer error: the length of a repeated field is runtime
    /// state, not something the schema can check ahead of time.
    pub fn get_primitive_at(&self, e: &Entity, n: usize) -> Result<Primitive, AccessError> {
        debug_assert!(self.repeated && !self.data_type.is_ref_type());
        let width = self.data_type.width_in_bytes();
        let container = e.entities[self.offset]
            .as_deref()
            .expect("field has not been reserved");
        let len = container.data.len() / width;
        if n >= len {
            return Err(AccessError::IndexOutOfRange { index: n, len });
        }
        Ok(read_primitive(&container.data, n * width, width))
    }

    /// Writes the `n`th element of a repeated, value-typed field.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::IndexOutOfRange`] if `n` is out of range —
    /// see [`MessageFieldDef::get_primitive_at`].
    pub fn set_primitive_at(
        &self,
        e: &mut Entity,
        n: usize,
        value: Primitive,
    ) -> Result<(), AccessError> {
        debug_assert!(self.repeated && !self.data_type.is_ref_type());
        let width = self.data_type.width_in_bytes();
        let container = e.entities[self.offset]
            .as_deref_mut()
            .expect("field has not been reserved");
        let len = container.data.len() / width;
        if n >= len {
            return Err(AccessError::IndexOutOfRange { index: n, len });
        }
        write_primitive(&mut container.data, n * width, width, value);
        Ok(())
    }

    /// Reads the `n`th element of a repeated, reference-typed field.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::IndexOutOfRange`] if `n` is out of range —
    /// see [`MessageFieldDef::get_primitive_at`].
    pub fn get_reference_at<'a>(
        &self,
        e: &'a Entity,
        n: usize,
    ) -> Result<Reference<'a>, AccessError> {
        debug_assert!(self.repeated && self.data_type.is_ref_type());
        let container = e.entities[self.offset]
            .as_deref()
            .expect("field has not been reserved");
        let len = container.entities.len();
        if n >= len {
            return Err(AccessError::IndexOutOfRange { index: n, len });
        }
        Ok(Reference(container.entities[n].as_deref()))
    }

    /// Writes the `n`th element of a repeated, reference-typed field.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::IndexOutOfRange`] if `n` is out of range —
    /// see [`MessageFieldDef::get_primitive_at`].
    pub fn set_reference_at(
        &self,
        e: &mut Entity,
        n: usize,
        value: Option<Entity>,
    ) -> Result<(), AccessError> {
        debug_assert!(self.repeated && self.data_type.is_ref_type());
        let container = e.entities[self.offset]
            .as_deref_mut()
            .expect("field has not been reserved");
        let len = container.entities.len();
        if n >= len {
            return Err(AccessError::IndexOutOfRange { index: n, len });
        }
        container.entities[n] = value.map(Box::new);
        Ok(())
    }

    /// Reserves room for `count` additional elements of a repeated field,
    /// lazily allocating the field's container entity on first use.
    ///
    /// Returns the number of elements already present before this call —
    /// the index the first newly reserved element lands at.
    pub fn reserve(&self, e: &mut Entity, count: usize) -> usize {
        debug_assert!(self.repeated);
        let container = e.entities[self.offset].get_or_insert_with(|| Box::new(Entity::default()));
        if self.data_type.is_ref_type() {
            let n = container.entities.len();
            container.entities.resize_with(n + count, || None);
            n
        } else {
            let width = self.data_type.width_in_bytes();
            let n = container.data.len() / width;
            container.data.resize(container.data.len() + count * width, 0);
            n
        }
    }

    /// Number of elements currently reserved for a repeated field (0 if
    /// [`MessageFieldDef::reserve`] was never called).
    pub fn len(&self, e: &Entity) -> usize {
        debug_assert!(self.repeated);
        match e.entities[self.offset].as_deref() {
            None => 0,
            Some(container) => {
                if self.data_type.is_ref_type() {
                    container.entities.len()
                } else {
                    container.data.len() / self.data_type.width_in_bytes()
                }
            }
        }
    }

    /// True if the reserved length for this repeated field is zero.
    pub fn is_empty(&self, e: &Entity) -> bool {
        self.len(e) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    fn scalar_field(offset: usize) -> MessageFieldDef {
        MessageFieldDef {
            name: "n".into(),
            data_type: DataType::INT32_TYPE,
            tag: 1,
            repeated: false,
            offset,
            extensions: Extensions::new(),
        }
    }

    fn repeated_scalar_field(offset: usize) -> MessageFieldDef {
        MessageFieldDef {
            name: "ns".into(),
            data_type: DataType::INT32_TYPE,
            tag: 2,
            repeated: true,
            offset,
            extensions: Extensions::new(),
        }
    }

    #[test]
    fn primitive_field_roundtrip() {
        let field = scalar_field(0);
        let mut e = Entity {
            data: vec![0u8; 4],
            entities: vec![],
        };
        field.set_primitive(&mut e, Primitive::from_i32(-7));
        assert_eq!(field.get_primitive(&e).to_i32(), -7);
    }

    #[test]
    fn repeated_scalar_reserve_and_index() {
        let field = repeated_scalar_field(0);
        let mut e = Entity {
            data: vec![],
            entities: vec![None],
        };
        assert_eq!(field.len(&e), 0);
        let start = field.reserve(&mut e, 3);
        assert_eq!(start, 0);
        assert_eq!(field.len(&e), 3);
        field.set_primitive_at(&mut e, 0, Primitive::from_i32(1)).unwrap();
        field.set_primitive_at(&mut e, 1, Primitive::from_i32(2)).unwrap();
        field.set_primitive_at(&mut e, 2, Primitive::from_i32(3)).unwrap();
        assert_eq!(field.get_primitive_at(&e, 1).unwrap().to_i32(), 2);

        let more = field.reserve(&mut e, 2);
        assert_eq!(more, 3);
        assert_eq!(field.len(&e), 5);
    }

    #[test]
    fn reserve_zero_is_a_no_op() {
        let field = repeated_scalar_field(0);
        let mut e = Entity {
            data: vec![],
            entities: vec![None],
        };
        assert_eq!(field.reserve(&mut e, 0), 0);
        assert_eq!(field.len(&e), 0);
        field.reserve(&mut e, 3);
        assert_eq!(field.reserve(&mut e, 0), 3);
        assert_eq!(field.len(&e), 3);
    }

    #[test]
    fn reference_field_roundtrip() {
        let field = MessageFieldDef {
            name: "child".into(),
            data_type: DataType::entity(0),
            tag: 3,
            repeated: false,
            offset: 0,
            extensions: Extensions::new(),
        };
        let mut e = Entity {
            data: vec![],
            entities: vec![None],
        };
        assert!(field.get_reference(&e).is_null());
        field.set_reference(&mut e, Some(Entity::leaf(b"hi".to_vec())));
        assert_eq!(field.get_reference(&e).entity().unwrap().as_str(), "hi");
    }

    #[test]
    fn indexed_access_out_of_range_is_recoverable() {
        let field = repeated_scalar_field(0);
        let mut e = Entity {
            data: vec![],
            entities: vec![None],
        };
        field.reserve(&mut e, 2);
        assert_eq!(
            field.get_primitive_at(&e, 2).unwrap_err(),
            AccessError::IndexOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(
            field.set_primitive_at(&mut e, 5, Primitive::from_i32(0)).unwrap_err(),
            AccessError::IndexOutOfRange { index: 5, len: 2 }
        );

        let ref_field = MessageFieldDef {
            name: "children".into(),
            data_type: DataType::entity(0),
            tag: 4,
            repeated: true,
            offset: 0,
            extensions: Extensions::new(),
        };
        let mut re = Entity {
            data: vec![],
            entities: vec![None],
        };
        ref_field.reserve(&mut re, 1);
        assert_eq!(
            ref_field.get_reference_at(&re, 1).unwrap_err(),
            AccessError::IndexOutOfRange { index: 1, len: 1 }
        );
        assert_eq!(
            ref_field.set_reference_at(&mut re, 1, None).unwrap_err(),
            AccessError::IndexOutOfRange { index: 1, len: 1 }
        );
    }
}
