use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque 128-bit identifier of a schema's field layout.
///
/// Files carry the fingerprint of the layout they were written with. A reader
/// that expects a different non-null fingerprint refuses the file. The null
/// fingerprint (all zeros) means "no layout check requested".
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint {
    high: u64,
    low: u64,
}

impl Fingerprint {
    /// The null fingerprint (all zeros).
    pub const NULL: Fingerprint = Fingerprint { high: 0, low: 0 };

    /// Build a fingerprint from its two 64-bit halves.
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Build a fingerprint from 16 bytes (big-endian halves).
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        let mut high = [0u8; 8];
        let mut low = [0u8; 8];
        high.copy_from_slice(&bytes[..8]);
        low.copy_from_slice(&bytes[8..]);
        Self {
            high: u64::from_be_bytes(high),
            low: u64::from_be_bytes(low),
        }
    }

    /// The 16-byte big-endian representation.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.high.to_be_bytes());
        out[8..].copy_from_slice(&self.low.to_be_bytes());
        out
    }

    /// High 64 bits.
    pub const fn high(&self) -> u64 {
        self.high
    }

    /// Low 64 bits.
    pub const fn low(&self) -> u64 {
        self.low
    }

    /// Returns `true` if this is the null fingerprint.
    pub const fn is_null(&self) -> bool {
        self.high == 0 && self.low == 0
    }

    /// Two fingerprints conflict only when both are non-null and differ.
    pub fn conflicts_with(&self, other: &Fingerprint) -> bool {
        !self.is_null() && !other.is_null() && self != other
    }

    /// Hex-encoded string representation (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Parse from a 32-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 16 {
            return Err(TypeError::InvalidLength {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_bytes(arr))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Fingerprint(null)")
        } else {
            write!(f, "Fingerprint({})", self.to_hex())
        }
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 16]> for Fingerprint {
    fn from(bytes: [u8; 16]) -> Self {
        Self::from_bytes(bytes)
    }
}
