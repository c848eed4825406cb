use crate::{Algorithm, CryptoError, CryptoResult, SecretKey};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::ChaCha20Poly1305;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Envelope format version for forward compatibility
pub const ENVELOPE_VERSION: u32 = 1;

/// Sealed data plus everything needed to open it again (except the key)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedData {
    pub version: u32,
    pub algorithm: Algorithm,
    /// Base64 nonce
    pub nonce: String,
    /// Base64 ciphertext with the authentication tag appended
    pub ciphertext: String,
    /// Associated data bound to the ciphertext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Encrypt `plaintext` under `key`, optionally binding a context label
pub fn encrypt(
    algorithm: Algorithm,
    key: &SecretKey,
    plaintext: &[u8],
    context: Option<&str>,
) -> CryptoResult<EncryptedData> {
    let mut nonce = vec![0u8; algorithm.nonce_len()];
    SystemRandom::new()
        .fill(&mut nonce)
        .map_err(|_| CryptoError::RandomFailure)?;
    let aad = context.unwrap_or_default().as_bytes();

    let sealed = match algorithm {
        Algorithm::Aes256Gcm => {
            let aead_key = aes_key(key)?;
            let nonce = Nonce::try_assume_unique_for_key(&nonce)
                .map_err(|_| CryptoError::EncryptionFailed("bad nonce length".into()))?;
            let mut in_out = plaintext.to_vec();
            aead_key
                .seal_in_place_append_tag(nonce, Aad::from(aad), &mut in_out)
                .map_err(|_| CryptoError::EncryptionFailed("aes-256-gcm seal".into()))?;
            in_out
        }
        Algorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|_| {
                CryptoError::InvalidKeyLength {
                    expected: algorithm.key_len(),
                    actual: key.as_bytes().len(),
                }
            })?;
            cipher
                .encrypt(
                    chacha20poly1305::Nonce::from_slice(&nonce),
                    Payload { msg: plaintext, aad },
                )
                .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
        }
    };

    Ok(EncryptedData {
        version: ENVELOPE_VERSION,
        algorithm,
        nonce: STANDARD.encode(&nonce),
        ciphertext: STANDARD.encode(sealed),
        context: context.map(str::to_string),
    })
}

/// Open an envelope produced by [`encrypt`]
pub fn decrypt(key: &SecretKey, data: &EncryptedData) -> CryptoResult<Vec<u8>> {
    if data.version > ENVELOPE_VERSION {
        return Err(CryptoError::InvalidEnvelope(format!(
            "unsupported version {} (max supported: {})",
            data.version, ENVELOPE_VERSION
        )));
    }

    let nonce = STANDARD
        .decode(&data.nonce)
        .map_err(|e| CryptoError::InvalidEnvelope(format!("nonce: {}", e)))?;
    let mut sealed = STANDARD
        .decode(&data.ciphertext)
        .map_err(|e| CryptoError::InvalidEnvelope(format!("ciphertext: {}", e)))?;
    if nonce.len() != data.algorithm.nonce_len() {
        return Err(CryptoError::InvalidEnvelope("nonce length mismatch".into()));
    }
    let aad = data.context.as_deref().unwrap_or_default().as_bytes();

    match data.algorithm {
        Algorithm::Aes256Gcm => {
            let aead_key = aes_key(key)?;
            let nonce = Nonce::try_assume_unique_for_key(&nonce)
                .map_err(|_| CryptoError::InvalidEnvelope("nonce length mismatch".into()))?;
            let plaintext = aead_key
                .open_in_place(nonce, Aad::from(aad), &mut sealed)
                .map_err(|_| CryptoError::DecryptionFailed("aes-256-gcm open".into()))?;
            Ok(plaintext.to_vec())
        }
        Algorithm::ChaCha20Poly1305 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|_| {
                CryptoError::InvalidKeyLength {
                    expected: data.algorithm.key_len(),
                    actual: key.as_bytes().len(),
                }
            })?;
            cipher
                .decrypt(
                    chacha20poly1305::Nonce::from_slice(&nonce),
                    Payload { msg: &sealed, aad },
                )
                .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
        }
    }
}

fn aes_key(key: &SecretKey) -> CryptoResult<LessSafeKey> {
    let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes()).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: Algorithm::Aes256Gcm.key_len(),
            actual: key.as_bytes().len(),
        }
    })?;
    Ok(LessSafeKey::new(unbound))
}

/// String-in, string-out encryption capability consumed by the reconciler
pub trait EncryptionService: Send + Sync + fmt::Debug {
    /// Algorithm used for new ciphertext
    fn algorithm(&self) -> Algorithm;

    /// Seal plaintext into an opaque ciphertext string
    fn encrypt(&self, plaintext: &str) -> CryptoResult<String>;

    /// Open a ciphertext string produced by [`EncryptionService::encrypt`]
    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String>;
}

/// Default [`EncryptionService`] built from an algorithm and a key
#[derive(Debug, Clone)]
pub struct Cipher {
    algorithm: Algorithm,
    key: SecretKey,
    context: Option<String>,
}

impl Cipher {
    /// Create a cipher, checking the key fits the algorithm
    pub fn new(algorithm: Algorithm, key: SecretKey) -> CryptoResult<Self> {
        let actual = key.as_bytes().len();
        if actual != algorithm.key_len() {
            return Err(CryptoError::InvalidKeyLength {
                expected: algorithm.key_len(),
                actual,
            });
        }
        Ok(Self {
            algorithm,
            key,
            context: None,
        })
    }

    /// Build from operator-supplied strings, e.g. settings and an env var
    pub fn from_parts(algorithm: &str, encoded_key: &str) -> CryptoResult<Self> {
        let algorithm = algorithm.parse::<Algorithm>()?;
        Self::new(algorithm, SecretKey::parse(encoded_key)?)
    }

    /// Bind every ciphertext to a context label (e.g. the store key)
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl EncryptionService for Cipher {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn encrypt(&self, plaintext: &str) -> CryptoResult<String> {
        let envelope = encrypt(
            self.algorithm,
            &self.key,
            plaintext.as_bytes(),
            self.context.as_deref(),
        )?;
        serde_json::to_string(&envelope).map_err(|e| CryptoError::InvalidEnvelope(e.to_string()))
    }

    fn decrypt(&self, ciphertext: &str) -> CryptoResult<String> {
        let envelope: EncryptedData = serde_json::from_str(ciphertext)
            .map_err(|e| CryptoError::InvalidEnvelope(e.to_string()))?;
        if envelope.context != self.context {
            return Err(CryptoError::DecryptionFailed("context mismatch".into()));
        }
        let plaintext = decrypt(&self.key, &envelope)?;
        String::from_utf8(plaintext)
            .map_err(|e| CryptoError::DecryptionFailed(format!("plaintext is not UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cipher(algorithm: Algorithm) -> Cipher {
        Cipher::new(algorithm, SecretKey::generate(algorithm).unwrap()).unwrap()
    }

    #[test]
    fn test_roundtrip_both_algorithms() {
        for algorithm in [Algorithm::Aes256Gcm, Algorithm::ChaCha20Poly1305] {
            let cipher = cipher(algorithm);
            let sealed = cipher.encrypt("{\"llm\":[]}").unwrap();
            assert!(!sealed.contains("{\"llm\""));
            assert_eq!(cipher.decrypt(&sealed).unwrap(), "{\"llm\":[]}");
        }
    }

    #[test]
    fn test_fresh_nonce_per_encryption() {
        let cipher = cipher(Algorithm::Aes256Gcm);
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = cipher(Algorithm::Aes256Gcm).encrypt("secret").unwrap();
        let other = cipher(Algorithm::Aes256Gcm);
        assert!(matches!(
            other.decrypt(&sealed),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = cipher(Algorithm::ChaCha20Poly1305);
        let sealed = cipher.encrypt("secret").unwrap();
        let mut envelope: EncryptedData = serde_json::from_str(&sealed).unwrap();
        let mut raw = STANDARD.decode(&envelope.ciphertext).unwrap();
        raw[0] ^= 0x01;
        envelope.ciphertext = STANDARD.encode(raw);
        let tampered = serde_json::to_string(&envelope).unwrap();
        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_garbage_is_invalid_envelope() {
        let cipher = cipher(Algorithm::Aes256Gcm);
        assert!(matches!(
            cipher.decrypt("not json at all"),
            Err(CryptoError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_context_is_bound() {
        let key = SecretKey::generate(Algorithm::Aes256Gcm).unwrap();
        let a = Cipher::new(Algorithm::Aes256Gcm, key.clone())
            .unwrap()
            .with_context("ai_models_config");
        let b = Cipher::new(Algorithm::Aes256Gcm, key).unwrap().with_context("other");
        let sealed = a.encrypt("payload").unwrap();
        assert_eq!(a.decrypt(&sealed).unwrap(), "payload");
        assert!(b.decrypt(&sealed).is_err());
    }

    #[test]
    fn test_future_version_rejected() {
        let key = SecretKey::generate(Algorithm::Aes256Gcm).unwrap();
        let mut envelope = encrypt(Algorithm::Aes256Gcm, &key, b"x", None).unwrap();
        envelope.version = ENVELOPE_VERSION + 1;
        assert!(matches!(
            decrypt(&key, &envelope),
            Err(CryptoError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_from_parts() {
        let key = SecretKey::generate(Algorithm::ChaCha20Poly1305).unwrap();
        let cipher = Cipher::from_parts("chacha20-poly1305", &key.to_hex()).unwrap();
        assert_eq!(cipher.algorithm(), Algorithm::ChaCha20Poly1305);
    }

    proptest! {
        #[test]
        fn prop_roundtrip(plaintext in ".*") {
            let cipher = cipher(Algorithm::Aes256Gcm);
            let sealed = cipher.encrypt(&plaintext).unwrap();
            prop_assert_eq!(cipher.decrypt(&sealed).unwrap(), plaintext);
        }
    }
}
