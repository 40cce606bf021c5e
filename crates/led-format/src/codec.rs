//! Payload sinks and sources: raw bytes or one zstd stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

use led_types::Compression;

type Encoder = zstd::stream::write::Encoder<'static, BufWriter<File>>;
type Decoder = zstd::stream::read::Decoder<'static, BufReader<File>>;

/// Write side of a payload.
///
/// The zstd encoder is created on the first write, so a file that never
/// receives a record ends right after its header.
pub struct PayloadSink {
    compression: Compression,
    file: Option<BufWriter<File>>,
    encoder: Option<Encoder>,
}

impl PayloadSink {
    /// `file` is positioned just past the header.
    pub fn new(file: BufWriter<File>, compression: Compression) -> Self {
        Self {
            compression,
            file: Some(file),
            encoder: None,
        }
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        if let Some(encoder) = self.encoder.as_mut() {
            return encoder.write_all(bytes);
        }
        match self.compression {
            Compression::None => match self.file.as_mut() {
                Some(file) => file.write_all(bytes),
                None => Err(finished()),
            },
            Compression::Zstd { level } => {
                let file = self.file.take().ok_or_else(finished)?;
                let mut encoder = Encoder::new(file, level)?;
                encoder.write_all(bytes)?;
                self.encoder = Some(encoder);
                Ok(())
            }
        }
    }

    /// End the zstd frame if one was started, flush, and hand back the file.
    pub fn finish(mut self) -> io::Result<File> {
        let buffered = match self.encoder.take() {
            Some(encoder) => encoder.finish()?,
            None => self.file.take().ok_or_else(finished)?,
        };
        let file = buffered.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(file)
    }
}

fn finished() -> io::Error {
    io::Error::other("payload sink already finished")
}

/// Read side of a payload.
pub enum PayloadSource {
    /// Nothing follows the header.
    Empty,
    Raw(BufReader<File>),
    Zstd(Box<Decoder>),
}

impl PayloadSource {
    /// `file` is positioned just past the header.
    pub fn open(file: File, compression: Compression) -> io::Result<Self> {
        let mut reader = BufReader::new(file);
        if reader.fill_buf()?.is_empty() {
            return Ok(Self::Empty);
        }
        Ok(match compression {
            Compression::None => Self::Raw(reader),
            Compression::Zstd { .. } => Self::Zstd(Box::new(Decoder::with_buffer(reader)?)),
        })
    }

    /// Fill `buf` as far as the payload allows; returns the bytes read,
    /// short only at end of payload.
    pub fn read_full(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            filled += n;
        }
        Ok(filled)
    }
}

impl Read for PayloadSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Empty => Ok(0),
            Self::Raw(r) => r.read(buf),
            Self::Zstd(d) => d.read(buf),
        }
    }
}
