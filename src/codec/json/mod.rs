//! Encodes and decodes [`crate::entity::Entity`] instances against a
//! canonical JSON mapping, driven entirely by a
//! [`crate::registry::MessageDef`] via a hand-rolled lexer rather than
//! `serde_json` + reflection.

mod decode;
mod encode;
mod lexer;

use crate::entity::Entity;
use crate::error::JsonError;
use crate::registry::{MessageDef, Registry};

/// Encodes and decodes [`Entity`] instances as JSON objects.
///
/// Field order on encode always follows the definition's tag order, not
/// insertion order — this makes encoded output byte-for-byte comparable
/// across two entities of the same shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec {
    /// When set, a member naming a field not present on the target
    /// message definition is skipped during decode rather than rejected
    /// with [`JsonError::UnknownField`].
    ignore_unknown: bool,
    /// When set, decode fails with [`JsonError::MissingRequiredField`] if
    /// any of the definition's fields had no corresponding member in the
    /// input object. Independent of `ignore_unknown` — a message may
    /// tolerate unknown members while still requiring every field it
    /// knows about.
    require_all: bool,
}

impl JsonCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_unknown(mut self, ignore_unknown: bool) -> Self {
        self.ignore_unknown = ignore_unknown;
        self
    }

    pub fn with_require_all(mut self, require_all: bool) -> Self {
        self.require_all = require_all;
        self
    }

    /// Encodes `e` against `def`'s field layout as a JSON object,
    /// resolving nested entity types through `registry`.
    pub fn encode(&self, e: &Entity, def: &MessageDef, registry: &Registry) -> String {
        let mut out = String::new();
        encode::encode_message(e, def, registry, &mut out);
        out
    }

    /// Decodes `input` into a freshly allocated entity of `def`'s shape.
    pub fn decode(
        &self,
        input: &[u8],
        def: &MessageDef,
        registry: &Registry,
    ) -> Result<Entity, JsonError> {
        decode::decode_document(self, input, def, registry)
    }
}
