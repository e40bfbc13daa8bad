//! OpenPGP cipher and digest algorithm registries.
//!
//! Packets carry algorithms as one-octet ids. These enums give the ids
//! names and static properties (block, key and digest lengths) without
//! committing to an implementation; the [`cipher`](crate::cipher) and
//! [`hash`](crate::hash) modules decide what is actually instantiable.
//!
//! Ids 100 through 110 are the private/experimental range. This crate
//! assigns 101, 102 and 103 to Camellia-128/-192/-256, the private-use
//! numbering Camellia circulated under before receiving registered ids,
//! and leaves the rest of the range unassigned.

use std::fmt;

/// Symmetric cipher algorithm, by OpenPGP id.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum CipherAlgo {
    /// IDEA (1). Recognized but not provided by this build.
    Idea,
    /// Triple-DES in EDE mode with three subkeys (2).
    TripleDes,
    /// CAST5, also known as CAST-128 (3).
    Cast5,
    /// Blowfish with a 128-bit key (4).
    Blowfish,
    /// AES with a 128-bit key (7).
    Aes128,
    /// AES with a 192-bit key (8).
    Aes192,
    /// AES with a 256-bit key (9).
    Aes256,
    /// Twofish with a 256-bit key (10).
    Twofish,
    /// Camellia with a 128-bit key (11).
    Camellia128,
    /// Camellia with a 192-bit key (12).
    Camellia192,
    /// Camellia with a 256-bit key (13).
    Camellia256,
    /// Private or experimental algorithm (100..=110).
    Private(u8),
    /// Unknown algorithm id.
    Unknown(u8),
}

impl From<u8> for CipherAlgo {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Idea,
            2 => Self::TripleDes,
            3 => Self::Cast5,
            4 => Self::Blowfish,
            7 => Self::Aes128,
            8 => Self::Aes192,
            9 => Self::Aes256,
            10 => Self::Twofish,
            11 => Self::Camellia128,
            12 => Self::Camellia192,
            13 => Self::Camellia256,
            100..=110 => Self::Private(id),
            _ => Self::Unknown(id),
        }
    }
}

impl CipherAlgo {
    /// Returns the wire id of the algorithm.
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Self::Idea => 1,
            Self::TripleDes => 2,
            Self::Cast5 => 3,
            Self::Blowfish => 4,
            Self::Aes128 => 7,
            Self::Aes192 => 8,
            Self::Aes256 => 9,
            Self::Twofish => 10,
            Self::Camellia128 => 11,
            Self::Camellia192 => 12,
            Self::Camellia256 => 13,
            Self::Private(id) | Self::Unknown(id) => id,
        }
    }

    /// Returns the cipher block length in bytes, or 0 if unknown.
    #[must_use]
    pub fn block_len(self) -> usize {
        match self {
            Self::Idea | Self::TripleDes | Self::Cast5 | Self::Blowfish => 8,
            Self::Aes128
            | Self::Aes192
            | Self::Aes256
            | Self::Twofish
            | Self::Camellia128
            | Self::Camellia192
            | Self::Camellia256
            | Self::Private(101..=103) => 16,
            Self::Private(_) | Self::Unknown(_) => 0,
        }
    }

    /// Returns the key length in bytes, or 0 if unknown.
    #[must_use]
    pub fn key_len(self) -> usize {
        match self {
            Self::Idea | Self::Cast5 | Self::Blowfish | Self::Aes128 | Self::Camellia128 => 16,
            Self::TripleDes | Self::Aes192 | Self::Camellia192 => 24,
            Self::Aes256 | Self::Twofish | Self::Camellia256 => 32,
            Self::Private(id @ 101..=103) => match id {
                101 => 16,
                102 => 24,
                _ => 32,
            },
            Self::Private(_) | Self::Unknown(_) => 0,
        }
    }

    /// Reports whether the algorithm id is in the private/experimental
    /// range, for which the CFB resynchronization step is suppressed.
    #[must_use]
    pub fn is_experimental(self) -> bool {
        self.id() >= 100
    }

    /// Reports whether this build can instantiate the cipher.
    ///
    /// IDEA is recognized but never instantiable; in the private range
    /// only the Camellia aliases are backed by an implementation.
    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            Self::Idea | Self::Private(100 | 104..=110) | Self::Unknown(_)
        )
    }
}

impl fmt::Display for CipherAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idea => write!(f, "IDEA"),
            Self::TripleDes => write!(f, "3DES"),
            Self::Cast5 => write!(f, "CAST5"),
            Self::Blowfish => write!(f, "Blowfish"),
            Self::Aes128 => write!(f, "AES-128"),
            Self::Aes192 => write!(f, "AES-192"),
            Self::Aes256 => write!(f, "AES-256"),
            Self::Twofish => write!(f, "Twofish"),
            Self::Camellia128 | Self::Private(101) => write!(f, "Camellia-128"),
            Self::Camellia192 | Self::Private(102) => write!(f, "Camellia-192"),
            Self::Camellia256 | Self::Private(103) => write!(f, "Camellia-256"),
            Self::Private(id) | Self::Unknown(id) => write!(f, "algorithm {id}"),
        }
    }
}

/// Digest algorithm, by OpenPGP id.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum HashAlgo {
    /// MD5 (1).
    Md5,
    /// SHA-1 (2). The digest the version 1 MDC is defined over.
    Sha1,
    /// RIPEMD-160 (3).
    Ripemd160,
    /// SHA-256 (8).
    Sha256,
    /// SHA-384 (9).
    Sha384,
    /// SHA-512 (10).
    Sha512,
    /// SHA-224 (11).
    Sha224,
    /// Unknown digest id.
    Unknown(u8),
}

impl From<u8> for HashAlgo {
    fn from(id: u8) -> Self {
        match id {
            1 => Self::Md5,
            2 => Self::Sha1,
            3 => Self::Ripemd160,
            8 => Self::Sha256,
            9 => Self::Sha384,
            10 => Self::Sha512,
            11 => Self::Sha224,
            _ => Self::Unknown(id),
        }
    }
}

impl HashAlgo {
    /// Returns the wire id of the algorithm.
    #[must_use]
    pub fn id(self) -> u8 {
        match self {
            Self::Md5 => 1,
            Self::Sha1 => 2,
            Self::Ripemd160 => 3,
            Self::Sha256 => 8,
            Self::Sha384 => 9,
            Self::Sha512 => 10,
            Self::Sha224 => 11,
            Self::Unknown(id) => id,
        }
    }

    /// Returns the digest length in bytes, or 0 if unknown.
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 | Self::Ripemd160 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
            Self::Unknown(_) => 0,
        }
    }

    /// Reports whether this build can instantiate the digest.
    #[must_use]
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for HashAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "MD5"),
            Self::Sha1 => write!(f, "SHA1"),
            Self::Ripemd160 => write!(f, "RIPEMD160"),
            Self::Sha256 => write!(f, "SHA256"),
            Self::Sha384 => write!(f, "SHA384"),
            Self::Sha512 => write!(f, "SHA512"),
            Self::Sha224 => write!(f, "SHA224"),
            Self::Unknown(id) => write!(f, "algorithm {id}"),
        }
    }
}
