//! Schema-guided decoder for the proto wire format.
//!
//! Decodes length-delimited, varint, and fixed-width fields keyed by tag
//! number, dispatching on the schema's declared type. Unknown fields are
//! skipped; truncation and unskippable wire types produce a [`DecodeError`]
//! carrying the byte offset.

use crate::error::DecodeError;
use crate::model::{Field, FieldType, Message, Schema};
use crate::value::{EnumValue, MessageValue, Value};
use bytes::Buf;
use indexmap::IndexMap;

const WIRE_VARINT: u32 = 0;
const WIRE_FIXED64: u32 = 1;
const WIRE_LEN: u32 = 2;
const WIRE_FIXED32: u32 = 5;

/// Decode `data` as one message of type `message_name`.
///
/// Empty input is valid and yields a message of defaults. Every declared
/// field is present in the result; absent scalars take proto3 defaults,
/// absent repeated fields decode to empty lists, absent message fields to
/// null.
pub fn decode_message(
    data: &[u8],
    message_name: &str,
    schema: &Schema,
) -> Result<Value, DecodeError> {
    let message = schema.message(message_name).ok_or_else(|| {
        DecodeError::new(0, format!("unknown message type '{message_name}'"))
    })?;
    let mut reader = Reader::new(data);
    decode_into(&mut reader, message, schema)
}

fn decode_into(
    reader: &mut Reader<'_>,
    message: &Message,
    schema: &Schema,
) -> Result<Value, DecodeError> {
    let mut out = MessageValue::new(&message.name);

    while reader.has_remaining() {
        let key = reader.varint()?;
        let field_number = (key >> 3) as u32;
        let wire_type = (key & 0x7) as u32;

        match message.field_by_number(field_number) {
            Some(field) => decode_field(reader, wire_type, field, schema, &mut out)?,
            None => skip_field(reader, wire_type, field_number)?,
        }
    }

    // proto3 default semantics for everything the wire left out.
    for field in &message.fields {
        if out.fields.contains_key(&field.name) {
            continue;
        }
        let value = if field.repeated {
            Value::List(Vec::new())
        } else {
            schema.default_value(&field.ty)
        };
        out.fields.insert(field.name.clone(), value);
    }
    // Keep field order as declared, not as encountered on the wire.
    let mut ordered = IndexMap::new();
    for field in &message.fields {
        if let Some(v) = out.fields.shift_remove(&field.name) {
            ordered.insert(field.name.clone(), v);
        }
    }
    out.fields = ordered;

    Ok(Value::Message(out))
}

fn decode_field(
    reader: &mut Reader<'_>,
    wire_type: u32,
    field: &Field,
    schema: &Schema,
    out: &mut MessageValue,
) -> Result<(), DecodeError> {
    // Packed repeated scalars (and enums) arrive length-delimited
    // regardless of the element wire type.
    let packed_capable = match &field.ty {
        FieldType::String | FieldType::Bytes => false,
        FieldType::Named(n) => schema.is_enum(n),
        FieldType::Map(_, _) => false,
        _ => true,
    };
    if field.repeated && wire_type == WIRE_LEN && packed_capable {
        let chunk = reader.length_delimited()?;
        let mut packed = Reader::with_base(chunk, reader.consumed_before_chunk(chunk.len()));
        let mut items = Vec::new();
        while packed.has_remaining() {
            items.push(decode_scalar(&mut packed, scalar_wire_type(&field.ty), field, schema)?);
        }
        append_repeated(out, &field.name, items);
        out.explicit.insert(field.name.clone());
        return Ok(());
    }

    let value = match (&field.ty, wire_type) {
        (FieldType::Map(key_ty, value_ty), WIRE_LEN) => {
            let chunk = reader.length_delimited()?;
            let base = reader.consumed_before_chunk(chunk.len());
            let (k, v) = decode_map_entry(chunk, base, key_ty, value_ty, schema)?;
            merge_map_entry(out, &field.name, k, v);
            out.explicit.insert(field.name.clone());
            return Ok(());
        }
        (FieldType::Named(name), WIRE_LEN) if !schema.is_enum(name) => {
            let chunk = reader.length_delimited()?;
            let nested = schema.message(name).ok_or_else(|| {
                DecodeError::new(reader.offset(), format!("unknown message type '{name}'"))
            })?;
            let base = reader.consumed_before_chunk(chunk.len());
            let mut sub = Reader::with_base(chunk, base);
            decode_into(&mut sub, nested, schema)?
        }
        _ => decode_scalar(reader, wire_type, field, schema)?,
    };

    if field.repeated {
        append_repeated(out, &field.name, vec![value]);
    } else {
        out.fields.insert(field.name.clone(), value);
    }
    out.explicit.insert(field.name.clone());
    Ok(())
}

fn decode_scalar(
    reader: &mut Reader<'_>,
    wire_type: u32,
    field: &Field,
    schema: &Schema,
) -> Result<Value, DecodeError> {
    match wire_type {
        WIRE_VARINT => {
            let raw = reader.varint()?;
            Ok(match &field.ty {
                FieldType::Bool => Value::Bool(raw != 0),
                FieldType::Sint32 | FieldType::Sint64 => Value::Int(zigzag(raw)),
                FieldType::Named(name) => match schema.enum_def(name) {
                    Some(en) => {
                        let number = raw as i32;
                        let symbol = en
                            .symbol_for(number)
                            .map(str::to_string)
                            .unwrap_or_else(|| number.to_string());
                        Value::Enum(EnumValue { symbol, number })
                    }
                    None => {
                        return Err(DecodeError::new(
                            reader.offset(),
                            format!("varint for non-enum field '{}'", field.name),
                        ));
                    }
                },
                _ => Value::Int(raw as i64),
            })
        }
        WIRE_FIXED64 => {
            let raw = reader.fixed64()?;
            Ok(match &field.ty {
                FieldType::Fixed64 | FieldType::Sfixed64 => Value::Int(raw as i64),
                _ => Value::Float(f64::from_bits(raw)),
            })
        }
        WIRE_FIXED32 => {
            let raw = reader.fixed32()?;
            Ok(match &field.ty {
                FieldType::Fixed32 | FieldType::Sfixed32 => Value::Int(raw as i64),
                _ => Value::Float(f32::from_bits(raw) as f64),
            })
        }
        WIRE_LEN => {
            let chunk = reader.length_delimited()?;
            Ok(match &field.ty {
                FieldType::Bytes => Value::Bytes(chunk.to_vec()),
                _ => {
                    let s = std::str::from_utf8(chunk).map_err(|_| {
                        DecodeError::new(
                            reader.offset(),
                            format!("field '{}' is not valid UTF-8", field.name),
                        )
                    })?;
                    Value::String(s.to_string())
                }
            })
        }
        other => Err(DecodeError::new(
            reader.offset(),
            format!("unsupported wire type {other} for field '{}'", field.name),
        )),
    }
}

fn decode_map_entry(
    chunk: &[u8],
    base: usize,
    key_ty: &FieldType,
    value_ty: &FieldType,
    schema: &Schema,
) -> Result<(String, Value), DecodeError> {
    // A map entry is a pseudo-message with key = 1 and value = 2.
    let entry = Message {
        name: "entry".into(),
        fields: vec![
            Field {
                name: "key".into(),
                number: 1,
                ty: key_ty.clone(),
                repeated: false,
            },
            Field {
                name: "value".into(),
                number: 2,
                ty: value_ty.clone(),
                repeated: false,
            },
        ],
    };
    let mut reader = Reader::with_base(chunk, base);
    let Value::Message(decoded) = decode_into(&mut reader, &entry, schema)? else {
        unreachable!("decode_into always yields a message");
    };
    let key = decoded
        .get("key")
        .map(Value::to_display)
        .unwrap_or_default();
    let value = decoded.get("value").cloned().unwrap_or(Value::Null);
    Ok((key, value))
}

fn append_repeated(out: &mut MessageValue, name: &str, mut items: Vec<Value>) {
    match out.fields.get_mut(name) {
        Some(Value::List(list)) => list.append(&mut items),
        _ => {
            out.fields.insert(name.to_string(), Value::List(items));
        }
    }
}

fn merge_map_entry(out: &mut MessageValue, name: &str, key: String, value: Value) {
    match out.fields.get_mut(name) {
        Some(Value::Map(map)) => {
            map.insert(key, value);
        }
        _ => {
            let mut map = IndexMap::new();
            map.insert(key, value);
            out.fields.insert(name.to_string(), Value::Map(map));
        }
    }
}

fn skip_field(reader: &mut Reader<'_>, wire_type: u32, number: u32) -> Result<(), DecodeError> {
    match wire_type {
        WIRE_VARINT => {
            reader.varint()?;
        }
        WIRE_FIXED64 => {
            reader.fixed64()?;
        }
        WIRE_FIXED32 => {
            reader.fixed32()?;
        }
        WIRE_LEN => {
            reader.length_delimited()?;
        }
        other => {
            return Err(DecodeError::new(
                reader.offset(),
                format!("cannot skip unknown field {number} with wire type {other}"),
            ));
        }
    }
    Ok(())
}

fn zigzag(raw: u64) -> i64 {
    ((raw >> 1) as i64) ^ -((raw & 1) as i64)
}

fn scalar_wire_type(ty: &FieldType) -> u32 {
    match ty {
        FieldType::Double | FieldType::Fixed64 | FieldType::Sfixed64 => WIRE_FIXED64,
        FieldType::Float | FieldType::Fixed32 | FieldType::Sfixed32 => WIRE_FIXED32,
        _ => WIRE_VARINT,
    }
}

/// Cursor over the input with absolute-offset error reporting.
struct Reader<'a> {
    buf: &'a [u8],
    base: usize,
    len: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            base: 0,
            len: buf.len(),
        }
    }

    fn with_base(buf: &'a [u8], base: usize) -> Self {
        Self {
            buf,
            base,
            len: buf.len(),
        }
    }

    fn offset(&self) -> usize {
        self.base + (self.len - self.buf.len())
    }

    /// Absolute offset of a chunk we just pulled out with
    /// [`Reader::length_delimited`].
    fn consumed_before_chunk(&self, chunk_len: usize) -> usize {
        self.offset() - chunk_len
    }

    fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    fn varint(&mut self) -> Result<u64, DecodeError> {
        let mut result: u64 = 0;
        let mut shift = 0u32;
        loop {
            if !self.buf.has_remaining() {
                return Err(DecodeError::new(self.offset(), "truncated varint"));
            }
            let byte = self.buf.get_u8();
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(DecodeError::new(self.offset(), "varint overflows 64 bits"));
            }
        }
    }

    fn fixed32(&mut self) -> Result<u32, DecodeError> {
        if self.buf.remaining() < 4 {
            return Err(DecodeError::new(self.offset(), "truncated fixed32"));
        }
        Ok(self.buf.get_u32_le())
    }

    fn fixed64(&mut self) -> Result<u64, DecodeError> {
        if self.buf.remaining() < 8 {
            return Err(DecodeError::new(self.offset(), "truncated fixed64"));
        }
        Ok(self.buf.get_u64_le())
    }

    fn length_delimited(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.varint()? as usize;
        if self.buf.remaining() < len {
            return Err(DecodeError::new(
                self.offset(),
                format!("length-delimited field of {len} bytes exceeds input"),
            ));
        }
        let chunk = &self.buf[..len];
        self.buf.advance(len);
        Ok(chunk)
    }
}
