//! Authenticated encryption for persisted configuration records
//!
//! The reconciler treats encryption as an opaque capability: anything that
//! implements [`EncryptionService`] can seal the serialized configuration
//! before it reaches the shared store. This crate provides the default
//! implementation, [`Cipher`], built from an [`Algorithm`] identifier and a
//! [`SecretKey`].
//!
//! # Envelope Format
//!
//! Ciphertext is a self-describing JSON envelope so that the algorithm and
//! nonce travel with the record:
//!
//! ```json
//! {
//!   "version": 1,
//!   "algorithm": "aes-256-gcm",
//!   "nonce": "...",
//!   "ciphertext": "...",
//!   "context": "ai_models_config"
//! }
//! ```
//!
//! # Example
//!
//! ```rust
//! use model_config_crypto::{Algorithm, Cipher, EncryptionService, SecretKey};
//!
//! let key = SecretKey::generate(Algorithm::Aes256Gcm).unwrap();
//! let cipher = Cipher::new(Algorithm::Aes256Gcm, key).unwrap();
//!
//! let sealed = cipher.encrypt("{\"llm\":[]}").unwrap();
//! assert_eq!(cipher.decrypt(&sealed).unwrap(), "{\"llm\":[]}");
//! ```

mod algorithm;
mod cipher;
mod key;

pub use algorithm::Algorithm;
pub use cipher::{decrypt, encrypt, Cipher, EncryptedData, EncryptionService, ENVELOPE_VERSION};
pub use key::{SecretKey, KEY_LEN};

use thiserror::Error;

/// Errors produced by key handling and authenticated encryption
#[derive(Error, Debug)]
pub enum CryptoError {
    /// The key material has the wrong length for the algorithm
    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// The key material could not be decoded
    #[error("Invalid key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// The algorithm identifier is not supported
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Sealing the plaintext failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Opening the ciphertext failed (wrong key, tampered data, bad nonce)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// The envelope is malformed or from an unsupported version
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Random number generation failed
    #[error("Random generation failed")]
    RandomFailure,
}

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;
