//! Error handling for seipd.
//!
//! Provides a unified error handling system based on the classic OpenPGP
//! processing error codes, with mapping from underlying I/O errors to
//! appropriate categories.
//!
//! # Error Categories
//!
//! Errors are categorized into the conditions a packet processor needs to
//! distinguish:
//! * Wrong or unusable key material ([`ErrorKind::BadKey`], [`ErrorKind::WeakKey`])
//! * Tampered or truncated ciphertext ([`ErrorKind::BadSignature`], [`ErrorKind::InvalidPacket`])
//! * Unsupported algorithms ([`ErrorKind::UnknownCipher`], [`ErrorKind::UnknownDigest`])
//! * Transport and internal failures ([`ErrorKind::Read`], [`ErrorKind::Internal`])
//!
//! # Example
//!
//! ```rust
//! use seipd::error::{Error, ErrorKind, Result};
//!
//! fn check_digest_len(len: usize) -> Result<()> {
//!     if len != 20 {
//!         return Err(Error::bad_signature("unexpected digest length"));
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
///
/// Provides:
/// * Categorized error types ([`ErrorKind`])
/// * Underlying error details
/// * Conversion from I/O errors
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for seipd operations.
///
/// Wraps the standard `Result` type with our custom [`struct@Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for encrypted-packet processing.
///
/// Each variant represents a distinct failure condition and carries the
/// traditional diagnostic string for it.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
pub enum ErrorKind {
    /// Session key failed the cipher-prefix quick check.
    #[error("Bad key")]
    BadKey,

    /// The MDC trailer did not match the running digest.
    #[error("Bad signature")]
    BadSignature,

    /// Packet structure is damaged, e.g. too short to hold its trailer.
    #[error("Invalid packet")]
    InvalidPacket,

    /// Cipher algorithm id is not supported by this build.
    #[error("Unknown cipher algorithm")]
    UnknownCipher,

    /// Digest algorithm id is not supported by this build.
    #[error("Unknown digest algorithm")]
    UnknownDigest,

    /// Key is on the published weak-key list for its cipher.
    ///
    /// Non-fatal: callers are expected to warn and proceed.
    #[error("Weak key")]
    WeakKey,

    /// Operation or parameter is outside what this crate implements.
    #[error("Not supported")]
    Unsupported,

    /// Reading the packet body failed.
    #[error("Read error")]
    Read,

    /// Invariant violation; indicates a bug or corrupt caller state.
    #[error("Internal error")]
    Internal,
}

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Creates an error for session keys rejected by the quick check.
    ///
    /// No cleartext has been produced when this is returned.
    pub fn bad_key<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::BadKey, error)
    }

    /// Creates an error for MDC mismatches.
    ///
    /// Cleartext may already have been handed downstream; callers must
    /// discard it when they see this kind.
    pub fn bad_signature<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::BadSignature, error)
    }

    /// Creates an error for structurally damaged packets.
    pub fn invalid_packet<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidPacket, error)
    }

    /// Creates an error for unsupported cipher algorithm ids.
    pub fn unknown_cipher<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UnknownCipher, error)
    }

    /// Creates an error for unsupported digest algorithm ids.
    pub fn unknown_digest<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::UnknownDigest, error)
    }

    /// Creates the non-fatal weak-key notification.
    pub fn weak_key<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::WeakKey, error)
    }

    /// Creates an error for unimplemented operations.
    pub fn unsupported<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unsupported, error)
    }

    /// Creates an error for failed reads from the packet body.
    pub fn read<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Read, error)
    }

    /// Creates an error for violated invariants.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Attempts to downcast the underlying error to a concrete type.
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }
}

impl std::error::Error for Error {
    /// Returns the underlying error source.
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

impl fmt::Display for Error {
    /// Formats the error for display, showing both kind and details.
    ///
    /// Format: "{kind}: {details}"
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

impl From<std::io::Error> for Error {
    /// Converts I/O errors into appropriate error kinds.
    ///
    /// An unexpected end of file means the packet body stopped short of
    /// its declared contents; everything else is a transport failure.
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::invalid_packet(err),
            _ => Self::read(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_preserved() {
        let err = Error::bad_key("prefix mismatch");
        assert_eq!(err.kind, ErrorKind::BadKey);
        assert_eq!(err.to_string(), "Bad key: prefix mismatch");
    }

    #[test]
    fn io_eof_becomes_invalid_packet() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        assert_eq!(Error::from(io).kind, ErrorKind::InvalidPacket);

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert_eq!(Error::from(io).kind, ErrorKind::Read);
    }
}
