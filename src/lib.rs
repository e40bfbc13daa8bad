//! Streaming decryption of OpenPGP encrypted-data packets.
//!
//! **seipd** implements the pull side of OpenPGP's symmetrically encrypted
//! data packets (both the plain and the integrity-protected flavour): given
//! a session key and the packet body, it verifies the key-check prefix,
//! decrypts the payload as it is being read, and checks the Modification
//! Detection Code trailer once the stream runs dry. It provides:
//!
//! # Core Features
//!
//! * **Streaming Decryption**: Cleartext is produced through `BufRead`,
//!   block by block, without buffering the whole packet
//! * **Integrity Protection**: The 20-byte MDC trailer is withheld from the
//!   cleartext stream and verified against a running digest
//! * **Quick Key Check**: Wrong session keys are rejected from the cipher
//!   prefix before any cleartext is produced
//! * **Algorithm Agility**: Block ciphers and digests are selected at run
//!   time from their OpenPGP algorithm ids
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! * **Decryption**
//!   - [`decrypt`]: Decode filters and the decryption driver
//!   - [`cipher`]: CFB mode with OpenPGP resynchronization
//!   - [`hash`]: Runtime-selected digests for the MDC
//!
//! * **Packet Plumbing**
//!   - [`packet`]: Encrypted-data descriptor and session key
//!   - [`source`]: Length-limited pull access to the packet body
//!   - [`algo`]: OpenPGP cipher and digest algorithm registries
//!
//! * **Utilities**
//!   - [`error`]: Error types and handling
//!
//! # Example
//!
//! ```rust,no_run
//! use seipd::algo::{CipherAlgo, HashAlgo};
//! use seipd::packet::{Dek, EncryptedData};
//! use std::io::Read;
//!
//! fn example(body: impl Read + 'static, key: &[u8]) -> seipd::error::Result<Vec<u8>> {
//!     let dek = Dek::new(CipherAlgo::Aes128, key, true);
//!     let mut ed = EncryptedData::new(body, 0, Some(HashAlgo::Sha1));
//!
//!     let mut cleartext = Vec::new();
//!     seipd::decrypt_data(&mut ed, &dek, |packets| {
//!         let _ = packets.read_to_end(&mut cleartext);
//!     })?;
//!
//!     Ok(cleartext)
//! }
//! ```
//!
//! # Error Handling
//!
//! Errors are handled through the types in the [`error`] module, with
//! most functions returning [`Result`](error::Result). A failed MDC check
//! surfaces as [`ErrorKind::BadSignature`](error::ErrorKind::BadSignature)
//! *after* the downstream consumer has run; callers must treat cleartext
//! as provisional until [`decrypt_data`] has returned `Ok`.
//!
//! # Concurrency
//!
//! Decryption is synchronous and pull-driven: the downstream consumer
//! reads from the filter, the filter reads from the packet body. A
//! consumer may recursively invoke [`decrypt_data`] for nested encrypted
//! packets; every invocation carries its own filter state.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![doc(test(attr(ignore)))]

#[macro_use]
extern crate log;

pub mod algo;
pub mod cipher;
pub mod decrypt;
pub mod error;
pub mod hash;
pub mod packet;
pub mod source;

pub use decrypt::decrypt_data;
