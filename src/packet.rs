//! The encrypted-data descriptor and the session key.
//!
//! These are the two inputs the packet parser and the key-establishment
//! layer hand to [`decrypt_data`](crate::decrypt_data): a description of
//! the ciphertext body and the key to open it with. Neither type does
//! any cryptography itself.

use std::cell::Cell;
use std::io::Read;

use veil::Redact;
use zeroize::Zeroizing;

use crate::algo::{CipherAlgo, HashAlgo};
use crate::source::PacketSource;

/// Descriptor of one encrypted-data packet body.
///
/// Ownership of the byte source transfers into the decryption driver on
/// use: after a [`decrypt_data`](crate::decrypt_data) call the source is
/// gone from the descriptor, so it cannot be consumed twice.
pub struct EncryptedData {
    /// Declared remaining ciphertext length; 0 means "until EOF".
    len: u64,

    /// Digest protecting the packet, or `None` for the legacy packet
    /// shape without an integrity trailer.
    mdc_method: Option<HashAlgo>,

    /// The ciphertext body. Taken by the decryption driver.
    buf: Option<PacketSource>,
}

impl EncryptedData {
    /// Creates a descriptor for a packet body.
    ///
    /// `len` of 0 means the body runs to the end of `reader` (the
    /// partial-packet shape).
    pub fn new<R>(reader: R, len: u64, mdc_method: Option<HashAlgo>) -> Self
    where
        R: Read + 'static,
    {
        Self {
            len,
            mdc_method,
            buf: Some(PacketSource::new(reader, len)),
        }
    }

    /// Returns the declared ciphertext length, 0 meaning "until EOF".
    #[must_use]
    pub fn declared_len(&self) -> u64 {
        self.len
    }

    /// Returns the digest protecting the packet, if any.
    #[must_use]
    pub fn mdc_method(&self) -> Option<HashAlgo> {
        self.mdc_method
    }

    /// Reports whether the byte source is still attached.
    ///
    /// `false` after the descriptor has been decrypted.
    #[must_use]
    pub fn has_source(&self) -> bool {
        self.buf.is_some()
    }

    /// Detaches the byte source, leaving the descriptor drained.
    pub(crate) fn take_source(&mut self) -> Option<PacketSource> {
        self.buf.take()
    }
}

impl std::fmt::Debug for EncryptedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedData")
            .field("len", &self.len)
            .field("mdc_method", &self.mdc_method)
            .field("has_source", &self.buf.is_some())
            .finish()
    }
}

/// A data encryption key: the session key plus its metadata.
///
/// Created by the key-establishment layer and borrowed read-only by the
/// decryption driver. The key bytes live in wiped-on-drop memory and are
/// masked in debug output.
#[derive(Redact)]
pub struct Dek {
    /// Cipher the key belongs to.
    algo: CipherAlgo,

    /// The raw session key.
    #[redact]
    key: Zeroizing<Vec<u8>>,

    /// Whether the key was established symmetrically.
    ///
    /// Only then is the cipher-prefix quick check enforced; a key from
    /// the public-key layer has already been authenticated there.
    symmetric: bool,

    /// Suppresses the repeated advisory algorithm line.
    algo_info_printed: Cell<bool>,
}

impl Dek {
    /// Creates a key for the given cipher.
    #[must_use]
    pub fn new(algo: CipherAlgo, key: &[u8], symmetric: bool) -> Self {
        Self {
            algo,
            key: Zeroizing::new(key.to_vec()),
            symmetric,
            algo_info_printed: Cell::new(false),
        }
    }

    /// Returns the cipher the key belongs to.
    #[must_use]
    pub fn algo(&self) -> CipherAlgo {
        self.algo
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Reports whether the key was established symmetrically.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Reports whether the advisory algorithm line has been emitted.
    #[must_use]
    pub fn algo_info_printed(&self) -> bool {
        self.algo_info_printed.get()
    }

    /// Marks the advisory algorithm line as emitted.
    pub fn mark_algo_info_printed(&self) {
        self.algo_info_printed.set(true);
    }
}
