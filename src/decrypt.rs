//! Packet decryption for OpenPGP encrypted-data packets.
//!
//! This module provides streaming decryption of an encrypted packet body
//! while the downstream packet processor is reading it:
//! * Verifies the key-check prefix before any cleartext is produced
//! * Decrypts the payload in 4KB blocks as needed
//! * Withholds and verifies the 20-byte MDC trailer
//!
//! # Wire Format
//!
//! The packet body is one continuous CFB stream:
//! * `block_len` random octets followed by a copy of the last two,
//!   giving a wrong-key detector with a 1-in-65536 false accept rate
//! * The cleartext payload
//! * For integrity-protected packets, a 20-byte trailer holding the
//!   digest over the decrypted prefix and payload, itself encrypted
//!
//! Packets without integrity protection resynchronize the CFB stream to
//! a block boundary right after the prefix; protected packets (and the
//! private/experimental algorithm range) do not.
//!
//! # Look-Ahead
//!
//! The trailer is not length-prefixed: the only way to know a byte is
//! part of the MDC is to reach end of stream at most 20 bytes later. The
//! protected-mode filter therefore keeps the 20 most recent ciphertext
//! bytes out of circulation, in encrypted form. Arriving data releases
//! the oldest deferred bytes into the cleartext stream; end of stream
//! freezes the window as the trailer candidate. A body that dries up
//! before the window ever fills cannot have carried a trailer and is
//! flagged as truncated.
//!
//! # Memory Management
//!
//! The implementation uses:
//! * A 4KB buffer for decrypted cleartext, refilled through `BufRead`
//! * A 20-byte deferral window, wiped on drop
//! * No buffering of the packet body as a whole
//!
//! # Examples
//!
//! ```rust
//! use seipd::algo::{CipherAlgo, HashAlgo};
//! use seipd::packet::{Dek, EncryptedData};
//! use seipd::decrypt_data;
//! use std::io::Read;
//!
//! let dek = Dek::new(CipherAlgo::Aes128, &key, true);
//! let mut ed = EncryptedData::new(body, 0, Some(HashAlgo::Sha1));
//!
//! let mut cleartext = Vec::new();
//! decrypt_data(&mut ed, &dek, |packets| {
//!     let _ = packets.read_to_end(&mut cleartext);
//! })?;
//! // `cleartext` is only trustworthy now that decrypt_data returned Ok.
//! ```

use std::io::{self, BufRead, Read};

use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    cipher::{CfbCipher, CipherFlags, MAX_BLOCK_LEN},
    error::{Error, ErrorKind, Result},
    hash::MdcHash,
    packet::{Dek, EncryptedData},
    source::PacketSource,
};

/// Length of the MDC trailer in bytes (a SHA-1-sized digest).
pub const MDC_TRAILER_LEN: usize = 20;

/// Size of the cleartext buffer handed out through `BufRead` (4KB).
const DECODE_BUF_LEN: usize = 4 * 1024;

// The look-ahead scheme parks the deferral window in the first 20 bytes
// of the buffer, so the buffer must comfortably exceed two windows.
const _: () = assert!(DECODE_BUF_LEN > 2 * MDC_TRAILER_LEN);

/// How the packet body ended, as observed by the filter.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum StreamEnd {
    /// The body has not ended yet.
    Pending,
    /// Clean end of stream; the deferral window holds the trailer.
    Clean,
    /// The body ended before a full trailer could have arrived.
    Truncated,
}

/// Decrypting filter between the packet body and the packet processor.
///
/// Pulled by the downstream consumer through `BufRead`/`Read`; pulls the
/// ciphertext from the packet body in turn. With a digest attached it
/// runs the trailer look-ahead and hashes every byte it emits; without
/// one it decrypts straight through.
struct DecodeFilter {
    /// The remaining packet body.
    source: PacketSource,

    /// Keyed CFB handle, past the prefix.
    cipher: CfbCipher,

    /// Running digest over emitted cleartext; `None` for legacy packets.
    hash: Option<MdcHash>,

    /// The 20 most recent body bytes, still encrypted.
    defer: Zeroizing<[u8; MDC_TRAILER_LEN]>,

    /// Whether `defer` holds data from a previous refill.
    defer_filled: bool,

    /// End-of-body classification.
    end: StreamEnd,

    /// Decrypted bytes ready for the consumer.
    buf: Vec<u8>,

    /// Read position in `buf`.
    pos: usize,
}

impl DecodeFilter {
    fn new(source: PacketSource, cipher: CfbCipher, hash: Option<MdcHash>) -> Self {
        Self {
            source,
            cipher,
            hash,
            defer: Zeroizing::new([0; MDC_TRAILER_LEN]),
            defer_filled: false,
            end: StreamEnd::Pending,
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Name for diagnostics.
    fn name(&self) -> &'static str {
        if self.hash.is_some() {
            "mdc_decode_filter"
        } else {
            "decode_filter"
        }
    }

    /// Dismantles the filter for trailer verification.
    fn finish(
        self,
    ) -> (
        CfbCipher,
        Option<MdcHash>,
        Zeroizing<[u8; MDC_TRAILER_LEN]>,
        StreamEnd,
    ) {
        (self.cipher, self.hash, self.defer, self.end)
    }

    fn refill(&mut self) -> io::Result<()> {
        if self.hash.is_some() {
            self.refill_protected()
        } else {
            self.refill_plain()
        }
    }

    /// Straight-through decryption for packets without a trailer.
    fn refill_plain(&mut self) -> io::Result<()> {
        self.pos = 0;
        self.buf.resize(DECODE_BUF_LEN, 0);

        let n = self.source.read_max(&mut self.buf)?;
        if n > 0 {
            self.cipher
                .decrypt(&mut self.buf[..n])
                .map_err(io::Error::other)?;
        }
        self.buf.truncate(n);
        Ok(())
    }

    /// Look-ahead decryption for integrity-protected packets.
    ///
    /// Every refill first reads one trailer length ahead into the upper
    /// part of the buffer. Only when that much arrives is the previously
    /// deferred window released as cleartext; at end of stream the
    /// window is frozen instead, because it *is* the trailer.
    fn refill_protected(&mut self) -> io::Result<()> {
        self.pos = 0;
        if self.end != StreamEnd::Pending {
            self.buf.clear();
            return Ok(());
        }

        self.buf.resize(DECODE_BUF_LEN, 0);
        let first = !self.defer_filled;

        let mut n = MDC_TRAILER_LEN;
        while n < 2 * MDC_TRAILER_LEN {
            match self.source.get_byte()? {
                Some(byte) => {
                    self.buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }

        if n == 2 * MDC_TRAILER_LEN {
            if first {
                // Nothing deferred yet: the look-ahead becomes the window.
                self.buf.copy_within(MDC_TRAILER_LEN..2 * MDC_TRAILER_LEN, 0);
                n = MDC_TRAILER_LEN;
            } else {
                self.buf[..MDC_TRAILER_LEN].copy_from_slice(&*self.defer);
            }
            n += self.source.read_max(&mut self.buf[n..DECODE_BUF_LEN])?;
            // Park the newest trailer length back in the window.
            n -= MDC_TRAILER_LEN;
            self.defer.copy_from_slice(&self.buf[n..n + MDC_TRAILER_LEN]);
            self.defer_filled = true;
            if n == 0 {
                // The whole body was one trailer with nothing before it.
                self.end = StreamEnd::Truncated;
            }
        } else if first {
            // End of stream inside the very first look-ahead: the body
            // cannot have carried a full trailer.
            n -= MDC_TRAILER_LEN;
            self.buf.copy_within(MDC_TRAILER_LEN..MDC_TRAILER_LEN + n, 0);
            self.end = StreamEnd::Truncated;
        } else {
            // Clean end of stream: release the window, freeze the last
            // trailer length as the trailer candidate.
            self.buf[..MDC_TRAILER_LEN].copy_from_slice(&*self.defer);
            n -= MDC_TRAILER_LEN;
            self.defer.copy_from_slice(&self.buf[n..n + MDC_TRAILER_LEN]);
            self.end = StreamEnd::Clean;
        }

        if n > 0 {
            self.cipher
                .decrypt(&mut self.buf[..n])
                .map_err(io::Error::other)?;
            if let Some(hash) = &mut self.hash {
                hash.write(&self.buf[..n]);
            }
        } else {
            debug_assert!(self.end != StreamEnd::Pending);
        }
        self.buf.truncate(n);
        Ok(())
    }
}

/// Provides buffered reading of decrypted cleartext.
impl BufRead for DecodeFilter {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos >= self.buf.len() {
            self.refill()?;
        }
        Ok(&self.buf[self.pos..])
    }

    #[inline]
    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.buf.len());
    }
}

impl Read for DecodeFilter {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let amt = std::cmp::min(available.len(), buf.len());
        buf[..amt].copy_from_slice(&available[..amt]);
        self.consume(amt);
        Ok(amt)
    }
}

impl std::fmt::Debug for DecodeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.name())
            .field("defer_filled", &self.defer_filled)
            .field("end", &self.end)
            .finish_non_exhaustive()
    }
}

/// Decrypts the packet body described by `ed` with the key `dek`.
///
/// Drives the whole packet: verifies the key-check prefix, installs the
/// decrypting filter over the packet body, hands the cleartext stream to
/// `proc_packets` (the recursive packet processor) and, once that has
/// returned, verifies the integrity trailer.
///
/// The byte source is consumed out of `ed` even on failure. Whatever
/// `proc_packets` observes does not pre-empt the trailer verdict; its
/// own failures travel through its own channel.
///
/// `proc_packets` may call `decrypt_data` again for nested encrypted
/// packets; every invocation carries its own state.
///
/// # Errors
///
/// * [`ErrorKind::UnknownCipher`] - the cipher algorithm is not available
/// * [`ErrorKind::BadKey`] - the quick check rejected the session key;
///   no cleartext has been produced
/// * [`ErrorKind::InvalidPacket`] - the body is too short to carry its
///   integrity trailer, or the descriptor had no byte source
/// * [`ErrorKind::BadSignature`] - the integrity trailer does not match;
///   cleartext already handed downstream must be discarded
/// * [`ErrorKind::Internal`] - impossible block length or a declared
///   length too short for the key check
pub fn decrypt_data<F>(ed: &mut EncryptedData, dek: &Dek, proc_packets: F) -> Result<()>
where
    F: FnOnce(&mut dyn BufRead),
{
    let algo = dek.algo();
    if !dek.algo_info_printed() {
        if algo.is_supported() {
            info!("{algo} encrypted data");
        } else {
            info!("encrypted with unknown algorithm {}", algo.id());
        }
        dek.mark_algo_info_printed();
    }

    if !algo.is_supported() {
        return Err(Error::unknown_cipher(format!("cannot decrypt with {algo}")));
    }

    let blocksize = algo.block_len();
    if blocksize == 0 || blocksize > MAX_BLOCK_LEN {
        return Err(Error::internal(format!("unsupported blocksize {blocksize}")));
    }
    let nprefix = blocksize;
    let declared = ed.declared_len();
    if declared != 0 && declared < (nprefix as u64 + 2) {
        return Err(Error::internal(
            "declared length cannot even hold the key check",
        ));
    }

    let mut hash = ed.mdc_method().map(MdcHash::open).transpose()?;

    // Resynchronization is a legacy-packet affair, and the experimental
    // algorithm range never had it.
    let flags = CipherFlags {
        secure: true,
        resync: ed.mdc_method().is_none() && !algo.is_experimental(),
    };
    let mut cipher = CfbCipher::open(algo, flags)
        .map_err(|e| Error::internal(format!("cipher open failed after algorithm check: {e}")))?;

    match cipher.set_key(dek.key()) {
        Ok(()) => {}
        Err(e) if e.kind == ErrorKind::WeakKey => {
            warn!("message was encrypted with a weak key in the symmetric cipher");
        }
        Err(e) => {
            error!("key setup failed: {e}");
            return Err(e);
        }
    }

    let Some(mut source) = ed.take_source() else {
        error!("problem handling encrypted packet");
        return Err(Error::invalid_packet("packet body has no byte source"));
    };

    cipher.set_iv()?;

    // Pull in the random prefix and its two check octets. A short read
    // is tolerated here; it cannot pass the checks below.
    let mut prefix = Zeroizing::new([0u8; MAX_BLOCK_LEN + 2]);
    let want = nprefix + 2;
    let mut got = 0;
    while got < want {
        match source.get_byte()? {
            Some(byte) => {
                prefix[got] = byte;
                got += 1;
            }
            None => break,
        }
    }

    cipher.decrypt(&mut prefix[..want])?;
    if flags.resync {
        cipher.sync()?;
    }

    if dek.is_symmetric()
        && (prefix[nprefix - 2] != prefix[nprefix] || prefix[nprefix - 1] != prefix[nprefix + 1])
    {
        return Err(Error::bad_key("session key failed the prefix check"));
    }

    // The trailer digest covers the decrypted prefix as well.
    if let Some(hash) = &mut hash {
        hash.write(&prefix[..want]);
    }

    let mut filter = DecodeFilter::new(source, cipher, hash);
    debug!("pushing {} over the packet body", filter.name());
    proc_packets(&mut filter);

    let (mut cipher, hash, mut defer, end) = filter.finish();
    if let Some(hash) = hash {
        if end == StreamEnd::Truncated {
            return Err(Error::invalid_packet(
                "ciphertext too short to carry its integrity trailer",
            ));
        }

        let datalen = hash.algo().digest_len();
        cipher.decrypt(&mut defer[..])?;
        let digest = hash.finalize();
        if datalen != MDC_TRAILER_LEN || !bool::from(digest.ct_eq(&defer[..])) {
            return Err(Error::bad_signature(
                "integrity trailer does not match the data",
            ));
        }
    }
    Ok(())
}
