//! AES-GCM encryption and decryption of individual string fields.
//!
//! **Algorithm choice:** AES-GCM with a random 96-bit nonce per call. The key
//! size (16, 24 or 32 bytes) selects AES-128, AES-192 or AES-256. This matches
//! the layout of values already stored by earlier deployments, so existing rows
//! stay decryptable.
//!
//! **Never reuse a nonce under the same key.** GCM nonce reuse breaks both
//! confidentiality and authentication; every [`FieldCipher::encrypt`] call draws
//! a fresh nonce from the OS CSPRNG.

use aes_gcm::{
    aead::{consts::U12, rand_core::RngCore, Aead, KeyInit, OsRng},
    aes::Aes192,
    Aes128Gcm, Aes256Gcm, AesGcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag appended to every ciphertext.
pub const TAG_LEN: usize = 16;

/// Accepted key lengths in bytes (AES-128, AES-192, AES-256).
pub const VALID_KEY_LENS: [usize; 3] = [16, 24, 32];

/// Marks a key string as standard base64, decoded whatever its length.
pub const BASE64_KEY_PREFIX: &str = "base64:";

type Aes192Gcm = AesGcm<Aes192, U12>;

/// Errors produced by the cipher layer.
///
/// None of the messages carry key or plaintext material.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    /// The key is not 16, 24 or 32 bytes (raw or base64-decoded).
    #[error("invalid key: expected 16, 24 or 32 bytes")]
    InvalidKey,

    /// The ciphertext could not be decoded or is shorter than a nonce.
    #[error("malformed ciphertext")]
    Malformed,

    /// The authentication tag did not verify (wrong key or tampered data).
    #[error("ciphertext authentication failed")]
    AuthenticationFailed,

    /// The OS random source could not produce a nonce.
    #[error("entropy source unavailable")]
    EntropySourceFailure,
}

/// Key bytes held only for as long as it takes to build the AEAD instance.
///
/// Zeroed on drop.
struct KeyMaterial(Vec<u8>);

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

enum Sealer {
    Aes128(Aes128Gcm),
    Aes192(Aes192Gcm),
    Aes256(Aes256Gcm),
}

impl Sealer {
    fn seal(&self, nonce: &Nonce<U12>, plaintext: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Sealer::Aes128(c) => c.encrypt(nonce, plaintext),
            Sealer::Aes192(c) => c.encrypt(nonce, plaintext),
            Sealer::Aes256(c) => c.encrypt(nonce, plaintext),
        }
    }

    fn open(&self, nonce: &Nonce<U12>, sealed: &[u8]) -> Result<Vec<u8>, aes_gcm::Error> {
        match self {
            Sealer::Aes128(c) => c.decrypt(nonce, sealed),
            Sealer::Aes192(c) => c.decrypt(nonce, sealed),
            Sealer::Aes256(c) => c.decrypt(nonce, sealed),
        }
    }

    fn key_bits(&self) -> usize {
        match self {
            Sealer::Aes128(_) => 128,
            Sealer::Aes192(_) => 192,
            Sealer::Aes256(_) => 256,
        }
    }
}

/// Authenticated cipher for string fields, built once per process from the
/// configured key.
///
/// Holds no mutable state, so a single instance can be shared (behind an
/// `Arc`) by every request task and used fully in parallel.
pub struct FieldCipher {
    sealer: Sealer,
}

impl FieldCipher {
    /// Build a cipher from a key string.
    ///
    /// A `base64:` prefix marks the rest as standard base64. Without it, the
    /// string is used as raw bytes when its length is 16, 24 or 32 bytes and
    /// decoded as base64 otherwise. Decoded keys must be one of those lengths.
    ///
    /// Base64 of a 16 or 24 byte key is itself 24 or 32 characters long, so
    /// such keys need the prefix.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] for any other length or encoding.
    pub fn new(key: &str) -> Result<Self, CipherError> {
        let material = decode_key(key)?;
        Self::from_bytes(&material.0)
    }

    /// Build a cipher from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKey`] unless `key` is 16, 24 or 32 bytes.
    pub fn from_bytes(key: &[u8]) -> Result<Self, CipherError> {
        let sealer = match key.len() {
            16 => Sealer::Aes128(
                Aes128Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKey)?,
            ),
            24 => Sealer::Aes192(
                Aes192Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKey)?,
            ),
            32 => Sealer::Aes256(
                Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKey)?,
            ),
            _ => return Err(CipherError::InvalidKey),
        };
        Ok(Self { sealer })
    }

    /// AES key size in bits (128, 192 or 256).
    pub fn key_bits(&self) -> usize {
        self.sealer.key_bits()
    }

    /// Encrypt `plaintext` and return `base64(nonce ‖ ciphertext ‖ tag)`.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::EntropySourceFailure`] if no nonce could be drawn.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng
            .try_fill_bytes(&mut nonce_bytes)
            .map_err(|_| CipherError::EntropySourceFailure)?;
        let nonce = Nonce::<U12>::from(nonce_bytes);

        // A GCM seal with a valid key and 96-bit nonce only fails on absurd
        // input lengths; report it as an authentication-layer failure.
        let sealed = self
            .sealer
            .seal(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::AuthenticationFailed)?;

        debug_assert_eq!(sealed.len(), plaintext.len() + TAG_LEN);
        let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&sealed);
        Ok(STANDARD.encode(out))
    }

    /// Decrypt a value produced by [`FieldCipher::encrypt`].
    ///
    /// # Errors
    ///
    /// - [`CipherError::Malformed`] if the input is not base64, is shorter than
    ///   a nonce, or opens to bytes that are not UTF-8.
    /// - [`CipherError::AuthenticationFailed`] if the tag does not verify. No
    ///   partial plaintext is ever returned.
    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let bytes = STANDARD
            .decode(ciphertext)
            .map_err(|_| CipherError::Malformed)?;
        if bytes.len() < NONCE_LEN {
            return Err(CipherError::Malformed);
        }
        let (nonce_bytes, sealed) = bytes.split_at(NONCE_LEN);
        let nonce_bytes: [u8; NONCE_LEN] =
            nonce_bytes.try_into().map_err(|_| CipherError::Malformed)?;
        let nonce = Nonce::<U12>::from(nonce_bytes);

        let plaintext = self
            .sealer
            .open(&nonce, sealed)
            .map_err(|_| CipherError::AuthenticationFailed)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::Malformed)
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material is never printed.
        write!(f, "FieldCipher(aes-{}-gcm, [REDACTED])", self.key_bits())
    }
}

/// Encrypt `plaintext` under `key` (see [`FieldCipher::new`] for key rules).
///
/// # Errors
///
/// [`CipherError::InvalidKey`] before any work is done if the key is unusable,
/// otherwise as [`FieldCipher::encrypt`].
// One-shot forms; the server builds a single FieldCipher at startup instead.
#[allow(dead_code)]
pub fn encrypt(key: &str, plaintext: &str) -> Result<String, CipherError> {
    FieldCipher::new(key)?.encrypt(plaintext)
}

/// Decrypt `ciphertext` under `key` (see [`FieldCipher::new`] for key rules).
///
/// # Errors
///
/// [`CipherError::InvalidKey`] if the key is unusable, otherwise as
/// [`FieldCipher::decrypt`].
#[allow(dead_code)]
pub fn decrypt(key: &str, ciphertext: &str) -> Result<String, CipherError> {
    FieldCipher::new(key)?.decrypt(ciphertext)
}

fn decode_key(key: &str) -> Result<KeyMaterial, CipherError> {
    if let Some(encoded) = key.strip_prefix(BASE64_KEY_PREFIX) {
        return decode_base64_key(encoded);
    }
    if VALID_KEY_LENS.contains(&key.len()) {
        return Ok(KeyMaterial(key.as_bytes().to_vec()));
    }
    decode_base64_key(key)
}

fn decode_base64_key(encoded: &str) -> Result<KeyMaterial, CipherError> {
    let decoded = STANDARD
        .decode(encoded.trim())
        .map(KeyMaterial)
        .map_err(|_| CipherError::InvalidKey)?;
    if VALID_KEY_LENS.contains(&decoded.0.len()) {
        Ok(decoded)
    } else {
        Err(CipherError::InvalidKey)
    }
}
