//! Process-wide extension slots for attaching codec-specific hints to a
//! [`crate::registry::MessageFieldDef`] — for example, the protobuf codec's
//! [`crate::codec::protobuf::IntegerEncoding`] marker, which records whether
//! an integer field should be varint- or zigzag-encoded.
//!
//! Extensions are declared once per process via [`ExtensionMarker::register`]
//! (typically from a `once_cell`/`static`-style lazily-initialized constant
//! owned by a codec module) and attached to individual fields at schema
//! build time through [`Extensions::set`].

use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_SLOT: AtomicU32 = AtomicU32::new(0);

/// A process-wide slot reserved for one kind of per-field extension data.
///
/// All markers must be registered before the first [`Extensions`] container
/// is populated via [`Extensions::set`] — a marker registered afterward may
/// index past containers that were sized against an earlier slot count.
/// Codecs satisfy this by registering their markers the first time they are
/// used, from a `std::sync::OnceLock`-guarded initializer, before any
/// `Extensions::set` call reaches that codec's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtensionMarker {
    slot: usize,
}

impl ExtensionMarker {
    /// Reserves a new, process-wide extension slot.
    pub fn register() -> Self {
        let slot = NEXT_SLOT.fetch_add(1, Ordering::Relaxed) as usize;
        ExtensionMarker { slot }
    }
}

/// A per-field container of extension values, indexed by [`ExtensionMarker`].
#[derive(Debug, Clone, Default)]
pub struct Extensions {
    slots: Vec<Option<Box<dyn std::any::Any + Send + Sync>>>,
}

impl Extensions {
    pub fn new() -> Self {
        Extensions::default()
    }

    /// Attaches `value` under `marker`, growing the container if needed.
    pub fn set<T: std::any::Any + Send + Sync>(&mut self, marker: ExtensionMarker, value: T) {
        if self.slots.len() <= marker.slot {
            self.slots.resize_with(marker.slot + 1, || None);
        }
        self.slots[marker.slot] = Some(Box::new(value));
    }

    /// Reads the value attached under `marker`, if any, downcast to `T`.
    pub fn get<T: std::any::Any>(&self, marker: ExtensionMarker) -> Option<&T> {
        self.slots
            .get(marker.slot)
            .and_then(|slot| slot.as_ref())
            .and_then(|value| value.downcast_ref())
    }
}
