//! Polymorphic values
//!
//! [`ObjectWritable`] stores any [`Value`] behind a one-byte tag:
//!
//! ```text
//! tag  kind      payload
//! ───  ────────  ──────────────────────────────────────────────
//!  0   Null      (none)
//!  1   Boolean   1 byte
//!  2   Byte      1 byte
//!  3   Short     2 bytes BE
//!  4   Int       4 bytes BE
//!  5   Long      8 bytes BE
//!  6   Float     4 bytes IEEE-754
//!  7   Double    8 bytes IEEE-754
//!  8   Text      vint length + UTF-8
//!  9   Bytes     vint length + bytes
//! 10   Array     i32 count + tagged elements
//! 11   Record    vint type id + vint length + payload
//! 12   Map       i32 count + tagged (key, value) pairs
//! ```
//!
//! Record payloads are the encoding of a user [`Writable`]; the id is resolved
//! to a type name through the [`TypeRegistry`] shared by writer and reader.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::{Result, SeqFileError};
use crate::writable::{from_bytes, to_bytes, Text, Writable};

const TAG_NULL: u8 = 0;
const TAG_BOOLEAN: u8 = 1;
const TAG_BYTE: u8 = 2;
const TAG_SHORT: u8 = 3;
const TAG_INT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_FLOAT: u8 = 6;
const TAG_DOUBLE: u8 = 7;
const TAG_TEXT: u8 = 8;
const TAG_BYTES: u8 = 9;
const TAG_ARRAY: u8 = 10;
const TAG_RECORD: u8 = 11;
const TAG_MAP: u8 = 12;

/// Nesting limit for arrays and maps, so hostile input cannot exhaust the stack
const MAX_DEPTH: usize = 64;

// =============================================================================
// Value
// =============================================================================

/// Every kind of value an [`ObjectWritable`] can carry
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Record(RecordValue),
    /// Key to value pairs in insertion order
    Map(Vec<(Value, Value)>),
}

/// Encoded user record tagged with its type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordValue {
    pub type_name: String,
    pub payload: Vec<u8>,
}

impl RecordValue {
    /// Capture the encoding of `value`
    pub fn new<T: Writable>(value: &T) -> Result<Self> {
        Ok(Self {
            type_name: T::type_name(),
            payload: to_bytes(value)?,
        })
    }

    /// Decode the payload as `T`, which must be the recorded type
    pub fn decode<T: Writable + Default>(&self) -> Result<T> {
        let expected = T::type_name();
        if self.type_name != expected {
            return Err(SeqFileError::UnresolvedType(format!(
                "record holds {}, not {}",
                self.type_name, expected
            )));
        }
        from_bytes(&self.payload)
    }
}

impl Value {
    fn tag(&self) -> u8 {
        match self {
            Value::Null => TAG_NULL,
            Value::Boolean(_) => TAG_BOOLEAN,
            Value::Byte(_) => TAG_BYTE,
            Value::Short(_) => TAG_SHORT,
            Value::Int(_) => TAG_INT,
            Value::Long(_) => TAG_LONG,
            Value::Float(_) => TAG_FLOAT,
            Value::Double(_) => TAG_DOUBLE,
            Value::Text(_) => TAG_TEXT,
            Value::Bytes(_) => TAG_BYTES,
            Value::Array(_) => TAG_ARRAY,
            Value::Record(_) => TAG_RECORD,
            Value::Map(_) => TAG_MAP,
        }
    }

    /// Short name of the value's kind
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Byte(_) => "byte",
            Value::Short(_) => "short",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
            Value::Map(_) => "map",
        }
    }

    /// Value stored under `key` when this is a map; the last entry wins
    pub fn map_get(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Append the tagged encoding
    pub fn write(&self, out: &mut DataOutputBuffer, registry: &TypeRegistry) -> Result<()> {
        out.write_u8(self.tag());
        match self {
            Value::Null => {}
            Value::Boolean(v) => out.write_bool(*v),
            Value::Byte(v) => out.write_i8(*v),
            Value::Short(v) => out.write_i16(*v),
            Value::Int(v) => out.write_i32(*v),
            Value::Long(v) => out.write_i64(*v),
            Value::Float(v) => out.write_f32(*v),
            Value::Double(v) => out.write_f64(*v),
            Value::Text(v) => {
                Text::write_string(out, v);
            }
            Value::Bytes(v) => {
                out.write_vint(length_prefix(v.len())?);
                out.write_bytes(v);
            }
            Value::Array(values) => {
                out.write_i32(length_prefix(values.len())?);
                for value in values {
                    value.write(out, registry)?;
                }
            }
            Value::Record(record) => {
                let id = registry.id_of(&record.type_name).ok_or_else(|| {
                    SeqFileError::UnresolvedType(format!(
                        "record type {} is not registered",
                        record.type_name
                    ))
                })?;
                out.write_vlong(id as i64);
                out.write_vint(length_prefix(record.payload.len())?);
                out.write_bytes(&record.payload);
            }
            Value::Map(entries) => {
                out.write_i32(length_prefix(entries.len())?);
                for (key, value) in entries {
                    key.write(out, registry)?;
                    value.write(out, registry)?;
                }
            }
        }
        Ok(())
    }

    /// Decode one tagged value
    pub fn read(input: &mut DataInputBuffer, registry: &TypeRegistry) -> Result<Value> {
        Self::read_nested(input, registry, 0)
    }

    fn read_nested(input: &mut DataInputBuffer, registry: &TypeRegistry, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(SeqFileError::malformed("value nesting too deep"));
        }
        let value = match input.read_u8()? {
            TAG_NULL => Value::Null,
            TAG_BOOLEAN => Value::Boolean(input.read_bool()?),
            TAG_BYTE => Value::Byte(input.read_i8()?),
            TAG_SHORT => Value::Short(input.read_i16()?),
            TAG_INT => Value::Int(input.read_i32()?),
            TAG_LONG => Value::Long(input.read_i64()?),
            TAG_FLOAT => Value::Float(input.read_f32()?),
            TAG_DOUBLE => Value::Double(input.read_f64()?),
            TAG_TEXT => Value::Text(Text::read_string(input)?),
            TAG_BYTES => {
                let len = input.read_length()?;
                Value::Bytes(input.read_bytes(len)?.to_vec())
            }
            TAG_ARRAY => {
                let count = input.read_i32()?;
                if count < 0 {
                    return Err(SeqFileError::malformed(format!("negative array length {}", count)));
                }
                let mut values = Vec::with_capacity((count as usize).min(input.remaining()));
                for _ in 0..count {
                    values.push(Self::read_nested(input, registry, depth + 1)?);
                }
                Value::Array(values)
            }
            TAG_MAP => {
                let count = input.read_i32()?;
                if count < 0 {
                    return Err(SeqFileError::malformed(format!("negative map size {}", count)));
                }
                let mut entries = Vec::with_capacity((count as usize).min(input.remaining() / 2));
                for _ in 0..count {
                    let key = Self::read_nested(input, registry, depth + 1)?;
                    let value = Self::read_nested(input, registry, depth + 1)?;
                    entries.push((key, value));
                }
                Value::Map(entries)
            }
            TAG_RECORD => {
                let id = input.read_vlong()?;
                let type_name = u32::try_from(id)
                    .ok()
                    .and_then(|id| registry.name_of(id))
                    .ok_or_else(|| SeqFileError::UnresolvedType(format!("unknown record type id {}", id)))?;
                let len = input.read_length()?;
                Value::Record(RecordValue {
                    type_name,
                    payload: input.read_bytes(len)?.to_vec(),
                })
            }
            tag => return Err(SeqFileError::UnresolvedType(format!("unknown value tag {}", tag))),
        };
        Ok(value)
    }
}

fn length_prefix(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| SeqFileError::InvalidArgument(format!("length {} too large", len)))
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<(Value, Value)>> for Value {
    fn from(v: Vec<(Value, Value)>) -> Self {
        Value::Map(v)
    }
}

impl From<RecordValue> for Value {
    fn from(v: RecordValue) -> Self {
        Value::Record(v)
    }
}

// =============================================================================
// Type Registry
// =============================================================================

#[derive(Debug, Default)]
struct TypeTable {
    by_id: HashMap<u32, String>,
    by_name: HashMap<String, u32>,
    next_id: u32,
}

/// Table of user record types, keyed both ways between id and type name.
///
/// Writers and readers of the same files must register the same types with
/// the same ids; [`TypeRegistry::register_with_id`] pins ids explicitly.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    table: RwLock<TypeTable>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under the next free id, or return its existing id
    pub fn register<T: Writable>(&self) -> u32 {
        self.register_name(&T::type_name())
    }

    /// Register a type name under the next free id, or return its existing id
    pub fn register_name(&self, name: &str) -> u32 {
        let mut table = self.table.write();
        if let Some(&id) = table.by_name.get(name) {
            return id;
        }
        while table.by_id.contains_key(&table.next_id) {
            table.next_id += 1;
        }
        let id = table.next_id;
        table.next_id += 1;
        table.by_id.insert(id, name.to_string());
        table.by_name.insert(name.to_string(), id);
        id
    }

    /// Bind `name` to `id`; conflicting bindings are rejected
    pub fn register_with_id(&self, id: u32, name: &str) -> Result<()> {
        let mut table = self.table.write();
        match (table.by_id.get(&id), table.by_name.get(name)) {
            (Some(existing), _) if existing == name => return Ok(()),
            (Some(existing), _) => {
                return Err(SeqFileError::InvalidArgument(format!(
                    "type id {} already bound to {}",
                    id, existing
                )))
            }
            (None, Some(other)) => {
                return Err(SeqFileError::InvalidArgument(format!(
                    "type {} already bound to id {}",
                    name, other
                )))
            }
            (None, None) => {}
        }
        table.by_id.insert(id, name.to_string());
        table.by_name.insert(name.to_string(), id);
        Ok(())
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.table.read().by_name.get(name).copied()
    }

    pub fn name_of(&self, id: u32) -> Option<String> {
        self.table.read().by_id.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// ObjectWritable
// =============================================================================

/// Writable wrapper around a [`Value`]
#[derive(Debug, Clone, Default)]
pub struct ObjectWritable {
    registry: Arc<TypeRegistry>,
    value: Value,
}

impl ObjectWritable {
    pub fn new(registry: Arc<TypeRegistry>, value: Value) -> Self {
        Self { registry, value }
    }

    /// Empty (null) instance resolving records through `registry`
    pub fn with_registry(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            value: Value::Null,
        }
    }

    pub fn get(&self) -> &Value {
        &self.value
    }

    pub fn set(&mut self, value: Value) {
        self.value = value;
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl PartialEq for ObjectWritable {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Writable for ObjectWritable {
    fn type_name() -> String {
        "ObjectWritable".to_string()
    }

    fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
        self.value.write(out, &self.registry)
    }

    fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
        self.value = Value::read(input, &self.registry)?;
        Ok(())
    }
}
