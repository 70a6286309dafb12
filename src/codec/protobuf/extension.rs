//! A field extension selecting an alternate integer wire representation.

use std::sync::OnceLock;

use crate::builder::FieldSpec;
use crate::extension::ExtensionMarker;
use crate::registry::MessageFieldDef;
use crate::types::DataType;

/// Alternate integer wire representations a field can opt into via
/// [`with_varint`]/[`with_zigzag`]. A field with no `IntegerEncoding`
/// extension uses the default fixed-width encoding instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerEncoding {
    /// Base-128 varint of the value's raw bit pattern, sign-extended to 64
    /// bits for `Int32`/`Int64`.
    Varint,
    /// Base-128 varint of the zig-zag mapped value.
    ZigZag,
}

fn marker() -> ExtensionMarker {
    static MARKER: OnceLock<ExtensionMarker> = OnceLock::new();
    *MARKER.get_or_init(ExtensionMarker::register)
}

/// Marks `field` to encode/decode as a base-128 varint instead of the
/// default fixed-width representation.
///
/// # Panics
///
/// Panics if `field`'s type is not `Int32`, `Int64`, `Uint32`, or `Uint64`.
pub fn with_varint(field: FieldSpec) -> FieldSpec {
    let dt = field.data_type;
    assert!(
        dt == DataType::INT32_TYPE
            || dt == DataType::INT64_TYPE
            || dt == DataType::UINT32_TYPE
            || dt == DataType::UINT64_TYPE,
        "varint encoding is not valid on {dt:?}"
    );
    field.with_extension(marker(), IntegerEncoding::Varint)
}

/// Marks `field` to encode/decode as a zig-zag mapped base-128 varint
/// instead of the default fixed-width representation.
///
/// # Panics
///
/// Panics if `field`'s type is not `Int32` or `Int64`.
pub fn with_zigzag(field: FieldSpec) -> FieldSpec {
    let dt = field.data_type;
    assert!(
        dt == DataType::INT32_TYPE || dt == DataType::INT64_TYPE,
        "zigzag encoding is not valid on {dt:?}"
    );
    field.with_extension(marker(), IntegerEncoding::ZigZag)
}

pub(crate) fn of(f: &MessageFieldDef) -> Option<IntegerEncoding> {
    f.extensions.get::<IntegerEncoding>(marker()).copied()
}
