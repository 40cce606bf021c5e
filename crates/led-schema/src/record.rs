use std::fmt;
use std::sync::Arc;

use led_store::BitBuffer;

use crate::error::{SchemaError, SchemaResult};
use crate::layout::{Field, FieldKind, Layout};
use crate::schema::Schema;

/// A record of a runtime-declared [`Layout`], with fields accessed by name.
///
/// Integer setters keep the low bits of the value that fit the field's width.
#[derive(Clone)]
pub struct Record {
    layout: Arc<Layout>,
    buf: BitBuffer,
}

impl Record {
    pub(crate) fn new(layout: Arc<Layout>, buf: BitBuffer) -> Self {
        Self { layout, buf }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn get_uint(&self, name: &str) -> SchemaResult<u64> {
        let f = self.typed(name, FieldKind::UInt)?;
        Ok(self.buf.get_bits(f.bit_offset, f.bit_count)?)
    }

    pub fn set_uint(&mut self, name: &str, value: u64) -> SchemaResult<()> {
        let (offset, count) = self.slot(name, FieldKind::UInt)?;
        Ok(self.buf.set_bits(offset, count, value)?)
    }

    pub fn get_int(&self, name: &str) -> SchemaResult<i64> {
        let f = self.typed(name, FieldKind::Int)?;
        Ok(self.buf.get_signed(f.bit_offset, f.bit_count)?)
    }

    pub fn set_int(&mut self, name: &str, value: i64) -> SchemaResult<()> {
        let (offset, count) = self.slot(name, FieldKind::Int)?;
        Ok(self.buf.set_signed(offset, count, value)?)
    }

    pub fn get_float(&self, name: &str) -> SchemaResult<f32> {
        let f = self.typed(name, FieldKind::Float)?;
        Ok(self.buf.get_f32(f.bit_offset)?)
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> SchemaResult<()> {
        let (offset, _) = self.slot(name, FieldKind::Float)?;
        Ok(self.buf.set_f32(offset, value)?)
    }

    pub fn get_double(&self, name: &str) -> SchemaResult<f64> {
        let f = self.typed(name, FieldKind::Double)?;
        Ok(self.buf.get_f64(f.bit_offset)?)
    }

    pub fn set_double(&mut self, name: &str, value: f64) -> SchemaResult<()> {
        let (offset, _) = self.slot(name, FieldKind::Double)?;
        Ok(self.buf.set_f64(offset, value)?)
    }

    pub fn get_bool(&self, name: &str) -> SchemaResult<bool> {
        let f = self.typed(name, FieldKind::Bool)?;
        Ok(self.buf.get_bool(f.bit_offset)?)
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> SchemaResult<()> {
        let (offset, _) = self.slot(name, FieldKind::Bool)?;
        Ok(self.buf.set_bool(offset, value)?)
    }

    fn typed(&self, name: &str, expected: FieldKind) -> SchemaResult<&Field> {
        let field = self.layout.field(name)?;
        if field.kind != expected {
            return Err(SchemaError::KindMismatch {
                field: name.to_string(),
                expected,
                actual: field.kind,
            });
        }
        Ok(field)
    }

    fn slot(&self, name: &str, expected: FieldKind) -> SchemaResult<(u64, u32)> {
        self.typed(name, expected).map(|f| (f.bit_offset, f.bit_count))
    }
}

impl Schema for Record {
    fn buffer(&self) -> &BitBuffer {
        &self.buf
    }

    fn buffer_mut(&mut self) -> &mut BitBuffer {
        &mut self.buf
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.layout.name());
        for field in self.layout.fields() {
            let (offset, count) = (field.bit_offset, field.bit_count);
            let rendered = match field.kind {
                FieldKind::UInt => self.buf.get_bits(offset, count).map(|v| v.to_string()),
                FieldKind::Int => self.buf.get_signed(offset, count).map(|v| v.to_string()),
                FieldKind::Float => self.buf.get_f32(offset).map(|v| v.to_string()),
                FieldKind::Double => self.buf.get_f64(offset).map(|v| v.to_string()),
                FieldKind::Bool => self.buf.get_bool(offset).map(|v| v.to_string()),
            };
            match rendered {
                Ok(v) => s.field(&field.name, &format_args!("{v}")),
                Err(e) => s.field(&field.name, &format_args!("<{e}>")),
            };
        }
        s.finish()
    }
}
