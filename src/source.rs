//! Pull access to an encrypted packet body.
//!
//! A packet either declares its remaining length up front or, in partial
//! mode, simply runs to the end of the transport. [`PacketSource`] folds
//! both shapes into one reader: it hands out at most the declared number
//! of bytes and reports a clean end of stream after that, so the layers
//! above never have to re-check the length themselves.
//!
//! There is no seeking and no push-back; bytes leave the source exactly
//! once, in order.

use std::io::{self, Read};

/// Length-limited pull reader over a packet body.
pub struct PacketSource {
    /// The transport the body arrives on.
    inner: Box<dyn Read>,

    /// Bytes left to hand out; `None` means "until EOF".
    remaining: Option<u64>,
}

impl PacketSource {
    /// Wraps a transport reader.
    ///
    /// A `len` of 0 means the body extends to the end of the transport
    /// (the partial-packet shape); any other value bounds the body to
    /// exactly that many bytes.
    pub fn new<R>(inner: R, len: u64) -> Self
    where
        R: Read + 'static,
    {
        Self {
            inner: Box::new(inner),
            remaining: (len != 0).then_some(len),
        }
    }

    /// Reads a single byte, or `None` at end of stream.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the transport.
    pub fn get_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = [0u8; 1];
        Ok((self.read_max(&mut byte)? == 1).then_some(byte[0]))
    }

    /// Fills `buf` as far as the stream allows.
    ///
    /// Keeps reading until `buf` is full or the body ends, so a return
    /// shorter than `buf` always means end of stream and 0 always means
    /// "nothing left".
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the transport.
    pub fn read_max(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let want = match self.remaining {
            Some(remaining) => {
                let cap = usize::try_from(remaining).unwrap_or(usize::MAX);
                buf.len().min(cap)
            }
            None => buf.len(),
        };

        let mut filled = 0;
        while filled < want {
            match self.inner.read(&mut buf[filled..want]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }

        if let Some(remaining) = &mut self.remaining {
            *remaining -= filled as u64;
        }
        Ok(filled)
    }
}

impl std::fmt::Debug for PacketSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketSource")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}
