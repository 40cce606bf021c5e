//! Aligned-window arithmetic for bit-field access.
//!
//! Every bit-field access loads one aligned integer of 1, 2, 4 or 8 bytes and
//! shifts the field into place. This module computes which window to load and
//! how far to shift, and nothing else: it never touches memory, so the
//! endianness-dependent arithmetic can be tested on its own.

use led_types::ByteOrder;

use crate::error::{StoreError, StoreResult};

/// The aligned window holding one bit field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitWindow {
    /// First byte of the window within the store.
    pub start: usize,
    /// Window width in bytes: 1, 2, 4 or 8.
    pub width: usize,
    /// Right shift that moves the field to bit 0 of the window integer.
    pub shift: u32,
}

impl BitWindow {
    /// Mask of the field's bits in place within the window integer.
    pub fn mask(&self, bit_count: u32) -> u64 {
        low_bits(bit_count) << self.shift
    }
}

/// Mask of the low `bit_count` bits (`bit_count` in 1..=64).
pub(crate) fn low_bits(bit_count: u32) -> u64 {
    if bit_count >= 64 {
        u64::MAX
    } else {
        (1u64 << bit_count) - 1
    }
}

/// Locate the aligned window for `bit_count` bits starting at `bit_index` in a
/// store of `store_len` bytes.
///
/// The window is the smallest of 1, 2, 4 or 8 bytes covering the field's
/// first byte plus its bit offset. A window that would run past the end of the
/// store is moved back by the overrun, but never before byte 0; a store
/// shorter than the window is read as if zero-padded at its end.
///
/// Little-endian shift: `bit_offset + additional*8`.
/// Big-endian shift: `width*8 - bit_count - bit_offset - additional*8`.
pub fn bit_window(
    bit_index: u64,
    bit_count: u32,
    order: ByteOrder,
    store_len: usize,
) -> StoreResult<BitWindow> {
    if bit_count == 0 || bit_count > 64 {
        return Err(StoreError::InvalidWidth(bit_count));
    }
    let byte_index = (bit_index / 8) as usize;
    let bit_offset = (bit_index % 8) as u32;

    let end_bit = bit_index.checked_add(bit_count as u64);
    if end_bit.map_or(true, |end| end > store_len as u64 * 8) {
        return Err(StoreError::OutOfBounds {
            offset: byte_index,
            len: (bit_offset + bit_count).div_ceil(8) as usize,
            size: store_len,
        });
    }

    let width = match bit_offset + bit_count {
        0..=8 => 1,
        9..=16 => 2,
        17..=32 => 4,
        33..=64 => 8,
        _ => {
            return Err(StoreError::Misalignment {
                bit_index,
                bit_count,
            })
        }
    };

    let overrun = (byte_index + width).saturating_sub(store_len);
    let additional = overrun.min(byte_index);
    let start = byte_index - additional;
    let back_bits = additional as u32 * 8;

    let shift = match order {
        ByteOrder::Little => bit_offset + back_bits,
        ByteOrder::Big => width as u32 * 8 - bit_count - bit_offset - back_bits,
    };

    Ok(BitWindow {
        start,
        width,
        shift,
    })
}
