//! Runtime-selected digests for integrity trailers.
//!
//! The MDC names its digest by OpenPGP algorithm id, so the hash is
//! picked when the packet is parsed, not when the crate is compiled.
//! [`MdcHash`] wraps the concrete digest behind [`digest::DynDigest`]
//! and adds the byte accounting the decryption driver logs at trace
//! level (the classic "checkmdc" debug tap).

use digest::DynDigest;

use crate::{
    algo::HashAlgo,
    error::{Error, Result},
};

/// A streaming digest over the decrypted byte stream.
///
/// Bytes are fed in stream order: first the decrypted encryption prefix,
/// then every cleartext byte handed downstream. Finalizing consumes the
/// handle; the digest is then compared against the decrypted trailer.
pub struct MdcHash {
    /// Selected algorithm; fixes the digest length.
    algo: HashAlgo,

    /// The concrete digest state.
    digest: Box<dyn DynDigest>,

    /// Bytes hashed so far, for the trace tap.
    written: u64,
}

impl MdcHash {
    /// Opens a digest for the given algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::UnknownDigest`](crate::error::ErrorKind::UnknownDigest)
    /// if the algorithm is not instantiable.
    pub fn open(algo: HashAlgo) -> Result<Self> {
        let digest: Box<dyn DynDigest> = match algo {
            HashAlgo::Md5 => Box::new(md5::Md5::default()),
            HashAlgo::Sha1 => Box::new(sha1::Sha1::default()),
            HashAlgo::Ripemd160 => Box::new(ripemd::Ripemd160::default()),
            HashAlgo::Sha224 => Box::new(sha2::Sha224::default()),
            HashAlgo::Sha256 => Box::new(sha2::Sha256::default()),
            HashAlgo::Sha384 => Box::new(sha2::Sha384::default()),
            HashAlgo::Sha512 => Box::new(sha2::Sha512::default()),
            HashAlgo::Unknown(_) => {
                return Err(Error::unknown_digest(format!("cannot instantiate {algo}")))
            }
        };

        Ok(Self {
            algo,
            digest,
            written: 0,
        })
    }

    /// Returns the algorithm the digest was opened for.
    #[must_use]
    pub fn algo(&self) -> HashAlgo {
        self.algo
    }

    /// Feeds `data` into the digest.
    pub fn write(&mut self, data: &[u8]) {
        self.digest.update(data);
        self.written += data.len() as u64;
    }

    /// Finalizes the digest and returns it.
    #[must_use]
    pub fn finalize(self) -> Vec<u8> {
        let out = self.digest.finalize().into_vec();
        if log_enabled!(log::Level::Trace) {
            let hex: String = out.iter().map(|b| format!("{b:02x}")).collect();
            trace!("{} over {} bytes: {hex}", self.algo, self.written);
        }
        out
    }
}

impl std::fmt::Debug for MdcHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MdcHash")
            .field("algo", &self.algo)
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}
