use std::fs::OpenOptions;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use led_schema::SchemaDescriptor;
use led_types::Fingerprint;
use tracing::debug;

use crate::error::{FormatError, FormatResult};

/// Encoded header length in bytes.
pub const HEADER_SIZE: usize = 32;

/// `element_count` value of a file whose count was never patched in.
pub const UNKNOWN_COUNT: i64 = -1;

/// The fixed header at the start of every Led file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedHeader {
    /// Number of records, or [`UNKNOWN_COUNT`].
    pub element_count: i64,
    pub element_size: i64,
    pub fingerprint: Fingerprint,
}

impl LedHeader {
    pub fn new(count: Option<u64>, element_size: usize, fingerprint: Fingerprint) -> Self {
        Self {
            element_count: count.map_or(UNKNOWN_COUNT, |n| n as i64),
            element_size: element_size as i64,
            fingerprint,
        }
    }

    /// Header for files of `descriptor`'s records.
    pub fn for_descriptor<D: SchemaDescriptor>(descriptor: &D, count: Option<u64>) -> Self {
        Self::new(count, descriptor.size(), descriptor.fingerprint())
    }

    /// The record count, unless the header says it is unknown.
    pub fn count(&self) -> Option<u64> {
        (self.element_count >= 0).then_some(self.element_count as u64)
    }

    pub fn record_size(&self) -> usize {
        self.element_size as usize
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..8].copy_from_slice(&self.element_count.to_be_bytes());
        out[8..16].copy_from_slice(&self.element_size.to_be_bytes());
        out[16..32].copy_from_slice(&self.fingerprint.to_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> FormatResult<Self> {
        let mut word = [0u8; 8];
        word.copy_from_slice(&bytes[0..8]);
        let element_count = i64::from_be_bytes(word);
        word.copy_from_slice(&bytes[8..16]);
        let element_size = i64::from_be_bytes(word);
        let mut fp = [0u8; 16];
        fp.copy_from_slice(&bytes[16..32]);

        if element_count < UNKNOWN_COUNT {
            return Err(FormatError::InvalidHeader(format!(
                "negative element count {element_count}"
            )));
        }
        if element_size <= 0 {
            return Err(FormatError::InvalidHeader(format!(
                "element size {element_size} is not positive"
            )));
        }
        Ok(Self {
            element_count,
            element_size,
            fingerprint: Fingerprint::from_bytes(fp),
        })
    }

    pub fn read_from<R: Read>(reader: &mut R) -> FormatResult<Self> {
        let mut buf = [0u8; HEADER_SIZE];
        reader.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                FormatError::InvalidHeader("file shorter than the header".into())
            }
            _ => FormatError::Io(e),
        })?;
        Self::from_bytes(&buf)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> FormatResult<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Check that files with this header hold `descriptor`'s records.
    ///
    /// Fingerprints are compared first; a null fingerprint on either side
    /// skips that check.
    pub fn check<D: SchemaDescriptor>(&self, descriptor: &D) -> FormatResult<()> {
        let expected = descriptor.fingerprint();
        if expected.conflicts_with(&self.fingerprint) {
            return Err(FormatError::FingerprintMismatch {
                expected,
                actual: self.fingerprint,
            });
        }
        if self.record_size() != descriptor.size() {
            return Err(FormatError::ElementSizeMismatch {
                expected: descriptor.size(),
                actual: self.record_size(),
            });
        }
        Ok(())
    }
}

/// Overwrite the count field of the header of the file at `path`.
pub fn patch_count(path: &Path, count: u64) -> FormatResult<()> {
    let mut file = OpenOptions::new().write(true).open(path)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(&(count as i64).to_be_bytes())?;
    file.sync_data()?;
    debug!(path = %path.display(), count, "patched header count");
    Ok(())
}

#[cfg(test)]
mod tests {
    use led_schema::{IdSchema, LayoutBuilder};

    use super::*;

    #[test]
    fn layout_is_big_endian() {
        let header = LedHeader::new(Some(2), 16, Fingerprint::new(3, 4));
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 0, 0, 0, 2]);
        assert_eq!(&bytes[8..16], &[0, 0, 0, 0, 0, 0, 0, 16]);
        assert_eq!(bytes[23], 3);
        assert_eq!(bytes[31], 4);
        assert_eq!(LedHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn unknown_count() {
        let header = LedHeader::new(None, 8, Fingerprint::NULL);
        assert_eq!(header.element_count, UNKNOWN_COUNT);
        assert_eq!(&header.to_bytes()[0..8], &[0xff; 8]);
        assert!(header.count().is_none());
    }

    #[test]
    fn rejects_garbage() {
        let mut bytes = LedHeader::new(Some(1), 8, Fingerprint::NULL).to_bytes();
        bytes[8..16].copy_from_slice(&0i64.to_be_bytes());
        assert!(matches!(
            LedHeader::from_bytes(&bytes),
            Err(FormatError::InvalidHeader(_))
        ));
        bytes[0..8].copy_from_slice(&(-2i64).to_be_bytes());
        assert!(LedHeader::from_bytes(&bytes).is_err());

        let short = [0u8; 10];
        assert!(matches!(
            LedHeader::read_from(&mut &short[..]),
            Err(FormatError::InvalidHeader(_))
        ));
    }

    #[test]
    fn check_against_descriptor() {
        let schema = LayoutBuilder::new("p").uint("x", 8).build().unwrap();
        let header = LedHeader::for_descriptor(&schema, Some(0));
        assert!(header.check(&schema).is_ok());

        // Same size, different layout.
        let other = LayoutBuilder::new("q").int("x", 8).build().unwrap();
        assert!(matches!(
            header.check(&other),
            Err(FormatError::FingerprintMismatch { .. })
        ));

        // A null fingerprint on either side only checks the size.
        let anonymous = LedHeader::new(Some(0), schema.size(), Fingerprint::NULL);
        assert!(anonymous.check(&schema).is_ok());
        assert!(matches!(
            anonymous.check(&IdSchema),
            Err(FormatError::ElementSizeMismatch { expected: 8, actual: 9 })
        ));
    }

    #[test]
    fn patch_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.led");
        let mut file = std::fs::File::create(&path).unwrap();
        LedHeader::new(None, 8, Fingerprint::NULL).write_to(&mut file).unwrap();
        file.write_all(&[7u8; 8]).unwrap();
        drop(file);

        patch_count(&path, 1).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HEADER_SIZE + 8);
        let header = LedHeader::read_from(&mut &bytes[..]).unwrap();
        assert_eq!(header.count(), Some(1));
        assert_eq!(&bytes[HEADER_SIZE..], &[7u8; 8]);
    }
}
