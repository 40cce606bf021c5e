use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use led_store::{BitBuffer, ByteStore};
use led_types::Fingerprint;

use crate::error::{SchemaError, SchemaResult};
use crate::record::Record;
use crate::schema::SchemaDescriptor;

const FINGERPRINT_DOMAIN: &[u8] = b"led.layout.v1";

/// Value type of a layout field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    UInt,
    Int,
    Float,
    Double,
    Bool,
}

impl FieldKind {
    fn tag(self) -> u8 {
        match self {
            FieldKind::UInt => 1,
            FieldKind::Int => 2,
            FieldKind::Float => 3,
            FieldKind::Double => 4,
            FieldKind::Bool => 5,
        }
    }
}

/// One bit-packed field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub bit_offset: u64,
    pub bit_count: u32,
}

/// A finished record layout: the `id` field followed by declared fields.
#[derive(Clone, Debug)]
pub struct Layout {
    name: String,
    fields: Vec<Field>,
    by_name: HashMap<String, usize>,
    size: usize,
    fingerprint: Fingerprint,
}

impl Layout {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record length in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// All fields in declaration order, `id` first.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> SchemaResult<&Field> {
        self.by_name
            .get(name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| SchemaError::UnknownField(name.to_string()))
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes, {} fields)", self.name, self.size, self.fields.len())
    }
}

/// Declares a bit-packed layout field by field.
///
/// Every layout starts with `id`: a signed 64-bit field at bit 0. Fields are
/// packed back to back in declaration order; a field that could not be read
/// through a single 8-byte window from its position starts at the next byte
/// boundary instead. The first invalid declaration is reported by
/// [`build`](Self::build).
///
/// ```
/// use led_schema::LayoutBuilder;
///
/// let schema = LayoutBuilder::new("point")
///     .int("x", 20)
///     .int("y", 20)
///     .boolean("visible")
///     .build()
///     .unwrap();
/// assert_eq!(schema.layout().size(), 14);
/// ```
#[derive(Debug)]
pub struct LayoutBuilder {
    name: String,
    fields: Vec<Field>,
    cursor: u64,
    error: Option<SchemaError>,
}

impl LayoutBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![Field {
                name: "id".into(),
                kind: FieldKind::Int,
                bit_offset: 0,
                bit_count: 64,
            }],
            cursor: 64,
            error: None,
        }
    }

    /// Unsigned integer of `bits` bits (1..=64).
    pub fn uint(self, name: &str, bits: u32) -> Self {
        self.push(name, FieldKind::UInt, bits)
    }

    /// Two's-complement integer of `bits` bits (1..=64).
    pub fn int(self, name: &str, bits: u32) -> Self {
        self.push(name, FieldKind::Int, bits)
    }

    pub fn float(self, name: &str) -> Self {
        self.push(name, FieldKind::Float, 32)
    }

    pub fn double(self, name: &str) -> Self {
        self.push(name, FieldKind::Double, 64)
    }

    pub fn boolean(self, name: &str) -> Self {
        self.push(name, FieldKind::Bool, 1)
    }

    /// Skip `bits` unused bits.
    pub fn pad(mut self, bits: u32) -> Self {
        self.cursor += bits as u64;
        self
    }

    /// Move the next field to a multiple of `bytes` (1, 2, 4 or 8).
    pub fn align(mut self, bytes: u32) -> Self {
        if !matches!(bytes, 1 | 2 | 4 | 8) {
            self.fail(SchemaError::InvalidField {
                name: format!("align({bytes})"),
                reason: "alignment must be 1, 2, 4 or 8 bytes".into(),
            });
            return self;
        }
        let unit = bytes as u64 * 8;
        self.cursor = self.cursor.div_ceil(unit) * unit;
        self
    }

    pub fn build(self) -> SchemaResult<LayoutSchema> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let size = self.cursor.div_ceil(8) as usize;
        let fingerprint = fingerprint_of(&self.fields, size);
        let by_name = self
            .fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();
        Ok(LayoutSchema {
            layout: Arc::new(Layout {
                name: self.name,
                fields: self.fields,
                by_name,
                size,
                fingerprint,
            }),
        })
    }

    fn push(mut self, name: &str, kind: FieldKind, bits: u32) -> Self {
        if name.is_empty() {
            self.fail(SchemaError::InvalidField {
                name: name.into(),
                reason: "empty name".into(),
            });
            return self;
        }
        if bits == 0 || bits > 64 {
            self.fail(SchemaError::InvalidField {
                name: name.into(),
                reason: format!("width {bits} outside 1..=64"),
            });
            return self;
        }
        if self.fields.iter().any(|f| f.name == name) {
            self.fail(SchemaError::DuplicateField(name.into()));
            return self;
        }
        if self.cursor % 8 + bits as u64 > 64 {
            self.cursor = self.cursor.div_ceil(8) * 8;
        }
        self.fields.push(Field {
            name: name.into(),
            kind,
            bit_offset: self.cursor,
            bit_count: bits,
        });
        self.cursor += bits as u64;
        self
    }

    fn fail(&mut self, err: SchemaError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }
}

/// Domain-separated BLAKE3 over the field list, truncated to 128 bits.
/// The layout name is not part of it.
fn fingerprint_of(fields: &[Field], size: usize) -> Fingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(FINGERPRINT_DOMAIN);
    hasher.update(&(size as u64).to_le_bytes());
    for field in fields {
        hasher.update(&(field.name.len() as u64).to_le_bytes());
        hasher.update(field.name.as_bytes());
        hasher.update(&[field.kind.tag()]);
        hasher.update(&field.bit_offset.to_le_bytes());
        hasher.update(&field.bit_count.to_le_bytes());
    }
    let hash = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    Fingerprint::from_bytes(bytes)
}

/// Descriptor for records of a runtime-declared [`Layout`].
#[derive(Clone, Debug)]
pub struct LayoutSchema {
    layout: Arc<Layout>,
}

impl LayoutSchema {
    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

impl SchemaDescriptor for LayoutSchema {
    type Record = Record;

    fn name(&self) -> &str {
        self.layout.name()
    }

    fn size(&self) -> usize {
        self.layout.size()
    }

    fn fingerprint(&self) -> Fingerprint {
        self.layout.fingerprint()
    }

    fn view(&self, store: ByteStore) -> Record {
        Record::new(Arc::clone(&self.layout), BitBuffer::new(store))
    }
}
