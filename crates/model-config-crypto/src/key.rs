use crate::{Algorithm, CryptoError, CryptoResult};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use ring::rand::{SecureRandom, SystemRandom};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of every supported key in bytes
pub const KEY_LEN: usize = 32;

/// Symmetric key material, wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Generate a fresh random key for the algorithm
    pub fn generate(algorithm: Algorithm) -> CryptoResult<Self> {
        let mut bytes = vec![0u8; algorithm.key_len()];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| CryptoError::RandomFailure)?;
        Ok(Self { bytes })
    }

    /// Build a key from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Decode a hex-encoded key
    pub fn from_hex(encoded: &str) -> CryptoResult<Self> {
        let mut decoded = hex::decode(encoded.trim())
            .map_err(|e| CryptoError::InvalidKeyEncoding(format!("hex: {}", e)))?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    /// Decode a base64-encoded key (padded or unpadded)
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        let trimmed = encoded.trim();
        let mut decoded = STANDARD
            .decode(trimmed)
            .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
            .map_err(|e| CryptoError::InvalidKeyEncoding(format!("base64: {}", e)))?;
        let key = Self::from_bytes(&decoded);
        decoded.zeroize();
        key
    }

    /// Decode a key supplied by an operator, accepting hex or base64
    ///
    /// A 64-character hex string is unambiguous, so hex is tried first.
    pub fn parse(encoded: &str) -> CryptoResult<Self> {
        let trimmed = encoded.trim();
        if trimmed.len() == KEY_LEN * 2 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Self::from_hex(trimmed);
        }
        Self::from_base64(trimmed)
    }

    /// Hex encoding of the key (for provisioning tools)
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
