//! Schema layer for Hudl templates.
//!
//! Templates declare their input types in `/** ... */` comment blocks holding
//! a proto3 subset. This crate parses those blocks into a [`Schema`],
//! decodes wire-format request bodies into [`Value`]s guided by that
//! schema, and reads/writes the text-format preview files used by the dev
//! server.

pub mod error;
pub mod model;
pub mod parse;
pub mod textpb;
pub mod value;
pub mod wire;

pub use error::{DecodeError, SchemaError, TextFormatError};
pub use model::{EnumDef, Field, FieldType, Message, Schema};
pub use value::{EnumValue, MessageValue, Value};
pub use wire::decode_message;
