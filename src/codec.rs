//! Codecs that encode/decode [`crate::entity::Entity`] instances, driven
//! entirely by a [`crate::registry::MessageDef`] rather than by
//! compile-time generated bindings.

pub mod json;
pub mod protobuf;
