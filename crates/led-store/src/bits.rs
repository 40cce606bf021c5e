//! Signed, unsigned, floating point and boolean fields packed at arbitrary
//! bit offsets of a store.

use led_types::ByteOrder;

use crate::error::StoreResult;
use crate::store::ByteStore;
use crate::window::{bit_window, low_bits, BitWindow};

/// Typed bit-field access over one [`ByteStore`].
///
/// Bit `i` lives in byte `i / 8`. Within a byte, little-endian stores number
/// bits from the least significant end and big-endian stores from the most
/// significant end, so a field never changes meaning when its window grows.
///
/// Byte-aligned 8/16/32/64-bit fields skip the window arithmetic and go
/// straight to the store's aligned accessors.
#[derive(Clone, Debug)]
pub struct BitBuffer {
    store: ByteStore,
}

impl BitBuffer {
    pub fn new(store: ByteStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ByteStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ByteStore {
        &mut self.store
    }

    pub fn into_store(self) -> ByteStore {
        self.store
    }

    pub fn order(&self) -> ByteOrder {
        self.store.order()
    }

    /// Addressable bits.
    pub fn bit_len(&self) -> u64 {
        self.store.len() as u64 * 8
    }

    /// Unsigned value of `bit_count` bits at `bit_index`.
    pub fn get_bits(&self, bit_index: u64, bit_count: u32) -> StoreResult<u64> {
        if let Some(byte) = aligned(bit_index, bit_count) {
            return match bit_count {
                8 => self.store.get_u8(byte).map(u64::from),
                16 => self.store.get_u16(byte).map(u64::from),
                32 => self.store.get_u32(byte).map(u64::from),
                _ => self.store.get_u64(byte),
            };
        }
        let w = bit_window(bit_index, bit_count, self.order(), self.store.len())?;
        let raw = self.load(&w)?;
        Ok((raw >> w.shift) & low_bits(bit_count))
    }

    /// Sign-extended value of `bit_count` bits at `bit_index`.
    pub fn get_signed(&self, bit_index: u64, bit_count: u32) -> StoreResult<i64> {
        let raw = self.get_bits(bit_index, bit_count)?;
        Ok(sign_extend(raw, bit_count))
    }

    /// Store the low `bit_count` bits of `value` at `bit_index`; higher bits
    /// of `value` are discarded and neighbouring bits are left untouched.
    pub fn set_bits(&mut self, bit_index: u64, bit_count: u32, value: u64) -> StoreResult<()> {
        if let Some(byte) = aligned(bit_index, bit_count) {
            return match bit_count {
                8 => self.store.set_u8(byte, value as u8),
                16 => self.store.set_u16(byte, value as u16),
                32 => self.store.set_u32(byte, value as u32),
                _ => self.store.set_u64(byte, value),
            };
        }
        let w = bit_window(bit_index, bit_count, self.order(), self.store.len())?;
        let mask = w.mask(bit_count);
        let order = self.order();
        let avail = w.width.min(self.store.len() - w.start);
        self.store.with_bytes_mut(w.start, avail, |bytes| {
            let current = decode(order, w.width, bytes);
            let updated = (current & !mask) | ((value << w.shift) & mask);
            encode(order, w.width, updated, bytes);
        })
    }

    /// Store a signed value as `bit_count` two's-complement bits.
    pub fn set_signed(&mut self, bit_index: u64, bit_count: u32, value: i64) -> StoreResult<()> {
        self.set_bits(bit_index, bit_count, value as u64)
    }

    pub fn get_bool(&self, bit_index: u64) -> StoreResult<bool> {
        self.get_bits(bit_index, 1).map(|v| v != 0)
    }

    pub fn set_bool(&mut self, bit_index: u64, value: bool) -> StoreResult<()> {
        self.set_bits(bit_index, 1, value as u64)
    }

    pub fn get_f32(&self, bit_index: u64) -> StoreResult<f32> {
        self.get_bits(bit_index, 32).map(|v| f32::from_bits(v as u32))
    }

    pub fn set_f32(&mut self, bit_index: u64, value: f32) -> StoreResult<()> {
        self.set_bits(bit_index, 32, value.to_bits() as u64)
    }

    pub fn get_f64(&self, bit_index: u64) -> StoreResult<f64> {
        self.get_bits(bit_index, 64).map(f64::from_bits)
    }

    pub fn set_f64(&mut self, bit_index: u64, value: f64) -> StoreResult<()> {
        self.set_bits(bit_index, 64, value.to_bits())
    }

    fn load(&self, w: &BitWindow) -> StoreResult<u64> {
        let order = self.order();
        let avail = w.width.min(self.store.len() - w.start);
        self.store
            .with_bytes(w.start, avail, |bytes| decode(order, w.width, bytes))
    }
}

fn aligned(bit_index: u64, bit_count: u32) -> Option<usize> {
    if bit_index % 8 == 0 && matches!(bit_count, 8 | 16 | 32 | 64) {
        Some((bit_index / 8) as usize)
    } else {
        None
    }
}

fn sign_extend(raw: u64, bit_count: u32) -> i64 {
    if bit_count >= 64 {
        raw as i64
    } else {
        let unused = 64 - bit_count;
        ((raw << unused) as i64) >> unused
    }
}

/// Window integer from the stored bytes; bytes missing past a short store
/// read as zero.
fn decode(order: ByteOrder, width: usize, bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    match order {
        ByteOrder::Little => {
            buf[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
        ByteOrder::Big => {
            let start = 8 - width;
            buf[start..start + bytes.len()].copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        }
    }
}

fn encode(order: ByteOrder, width: usize, value: u64, bytes: &mut [u8]) {
    match order {
        ByteOrder::Little => bytes.copy_from_slice(&value.to_le_bytes()[..bytes.len()]),
        ByteOrder::Big => {
            let start = 8 - width;
            bytes.copy_from_slice(&value.to_be_bytes()[start..start + bytes.len()]);
        }
    }
}
