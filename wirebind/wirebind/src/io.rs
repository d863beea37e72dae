//! Stream adapters: the measuring sink and the bounded reader.
//!
//! These two types are the codec engine's entire I/O surface. The sink
//! backs both the public size operation and the internal measurement pass
//! for computed length fields; the reader enforces declared byte bounds so
//! one corrupt length cannot desynchronize every following field.

use std::io::{self, Read, Write};

use crate::error::WireError;

/// An output sink that counts bytes and discards them.
#[derive(Debug, Default)]
pub struct MeasuringSink {
    written: u64,
}

impl MeasuringSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl Write for MeasuringSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A reader restricted to a fixed byte budget.
///
/// `remaining == None` means unbounded (the engine's top-level reader).
/// [`narrow`](Self::narrow) carves an exact-length sub-reader for a
/// length-bound region and charges the parent budget up front, so the
/// parent stays consistent as long as the sub-region is consumed in full —
/// the engine always finishes a region with [`drain`](Self::drain).
///
/// A one-byte pushback slot supports clean end-of-input detection for
/// terminator-driven collections; the peeked byte still counts against the
/// budget and is handed to the next `take` or `narrow`.
pub struct BoundedReader<'r> {
    inner: &'r mut dyn Read,
    remaining: Option<u64>,
    peeked: Option<u8>,
}

impl<'r> BoundedReader<'r> {
    pub fn unbounded(inner: &'r mut dyn Read) -> Self {
        Self {
            inner,
            remaining: None,
            peeked: None,
        }
    }

    pub fn with_limit(inner: &'r mut dyn Read, limit: u64) -> Self {
        Self {
            inner,
            remaining: Some(limit),
            peeked: None,
        }
    }

    /// Bytes left in the budget; `None` when unbounded.
    pub fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    /// Fill `buf` exactly. A request past the budget is a bound violation;
    /// an underlying short read is truncation.
    pub fn take(&mut self, buf: &mut [u8], path: &str) -> Result<(), WireError> {
        let len = buf.len() as u64;
        if let Some(rem) = self.remaining
            && rem < len
        {
            return Err(WireError::BoundExceeded {
                path: path.to_string(),
                requested: len,
                available: rem,
            });
        }

        let mut filled = 0;
        if !buf.is_empty()
            && let Some(byte) = self.peeked.take()
        {
            buf[0] = byte;
            filled = 1;
        }
        if filled < buf.len() {
            self.inner
                .read_exact(&mut buf[filled..])
                .map_err(|e| match e.kind() {
                    io::ErrorKind::UnexpectedEof => WireError::TruncatedData {
                        path: path.to_string(),
                        needed: (buf.len() - filled) as u64,
                    },
                    _ => WireError::Io(e),
                })?;
        }
        if let Some(rem) = self.remaining.as_mut() {
            *rem -= len;
        }
        Ok(())
    }

    /// Read a single byte.
    pub fn take_byte(&mut self, path: &str) -> Result<u8, WireError> {
        let mut buf = [0u8; 1];
        self.take(&mut buf, path)?;
        Ok(buf[0])
    }

    /// Read exactly `len` bytes into an owned buffer. Allocation grows
    /// with the data actually read, not with the declared length.
    pub fn take_vec(&mut self, len: u64, path: &str) -> Result<Vec<u8>, WireError> {
        let mut out = Vec::with_capacity(len.min(4096) as usize);
        let mut chunk = [0u8; 4096];
        let mut left = len;
        while left > 0 {
            let want = left.min(chunk.len() as u64) as usize;
            self.take(&mut chunk[..want], path)?;
            out.extend_from_slice(&chunk[..want]);
            left -= want as u64;
        }
        Ok(out)
    }

    /// True at a clean end of input: the budget is spent, or the underlying
    /// stream reports EOF on an unbounded reader. A successfully probed
    /// byte is pushed back and served to the next read.
    pub fn at_end(&mut self) -> Result<bool, WireError> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        if self.remaining == Some(0) {
            return Ok(true);
        }
        let mut buf = [0u8; 1];
        loop {
            match self.inner.read(&mut buf) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.peeked = Some(buf[0]);
                    return Ok(false);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WireError::Io(e)),
            }
        }
    }

    /// Carve an exact `len`-byte sub-reader. The parent budget is charged
    /// immediately; the caller must consume the sub-region in full (the
    /// engine pairs every `narrow` with a `drain`).
    pub fn narrow(&mut self, len: u64, path: &str) -> Result<BoundedReader<'_>, WireError> {
        if let Some(rem) = self.remaining {
            if rem < len {
                return Err(WireError::BoundExceeded {
                    path: path.to_string(),
                    requested: len,
                    available: rem,
                });
            }
            self.remaining = Some(rem - len);
        }
        // A pushed-back byte is the stream head, so a non-empty sub-region
        // starts with it; a zero-length region leaves it where it is.
        let peeked = if len > 0 { self.peeked.take() } else { None };
        Ok(BoundedReader {
            inner: &mut *self.inner,
            remaining: Some(len),
            peeked,
        })
    }

    /// Explicitly consume whatever the contained codec left unread, so a
    /// declared length always advances the stream by exactly that many
    /// bytes. Only meaningful on a bounded reader.
    pub fn drain(&mut self, path: &str) -> Result<(), WireError> {
        let Some(mut rem) = self.remaining else {
            return Ok(());
        };
        if rem > 0 && self.peeked.take().is_some() {
            rem -= 1;
        }
        let mut scratch = [0u8; 256];
        while rem > 0 {
            let want = rem.min(scratch.len() as u64) as usize;
            match self.inner.read(&mut scratch[..want]) {
                Ok(0) => {
                    return Err(WireError::TruncatedData {
                        path: path.to_string(),
                        needed: rem,
                    });
                }
                Ok(n) => rem -= n as u64,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(WireError::Io(e)),
            }
        }
        self.remaining = Some(0);
        Ok(())
    }
}
