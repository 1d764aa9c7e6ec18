//! Per-message hybrid encryption.
//!
//! Every outgoing message is encrypted with a **fresh** 256-bit AES
//! key in CBC mode (PKCS#7 padding), and that key — Base64-encoded —
//! is wrapped under the recipient's RSA public key with PKCS#1 v1.5.
//! The asymmetric primitive therefore only ever sees small, fixed-size
//! key material, while the bulk payload goes through the fast
//! symmetric cipher; compromise of any single symmetric key exposes
//! exactly one message.
//!
//! All three transported fields (ciphertext, IV, wrapped key) are
//! Base64 strings, opaque to everything outside this module.
//!
//! # Integrity
//!
//! CBC without a MAC provides no integrity: tampered ciphertext that
//! happens to survive padding and UTF-8 checks decrypts to garbage
//! text. This is the modeled wire format, not an endorsement.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::Pkcs1v15Encrypt;
use thiserror::Error;

use whisperlink_types::{Result, WhisperlinkError};

use crate::identity::{Identity, PeerPublicKey};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Symmetric key length in bytes (AES-256).
pub const SYMMETRIC_KEY_LEN: usize = 32;

/// Initialization vector length in bytes (AES block size).
pub const IV_LEN: usize = 16;

// ---------------------------------------------------------------------------
// SealedMessage
// ---------------------------------------------------------------------------

/// The three opaque fields produced by [`seal_for_peer`].
///
/// Carried verbatim inside a message envelope. The symmetric key and
/// IV that produced them are not retained after sealing.
#[derive(Clone, Debug)]
pub struct SealedMessage {
    /// Base64-encoded AES-256-CBC ciphertext.
    pub ciphertext: String,
    /// Base64-encoded 16-byte IV.
    pub iv: String,
    /// Base64-encoded RSA wrap of the Base64-encoded symmetric key.
    pub encrypted_symmetric_key: String,
}

// ---------------------------------------------------------------------------
// DecryptFailure
// ---------------------------------------------------------------------------

/// Per-message decryption failure.
///
/// Not a [`WhisperlinkError`]: decrypt failures never propagate past
/// this boundary as faults. Callers substitute [`sentinel`] text for
/// display and continue processing subsequent events.
///
/// [`sentinel`]: DecryptFailure::sentinel
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecryptFailure {
    /// The RSA unwrap of the symmetric key failed (wrong private key
    /// or corrupted key material).
    #[error("symmetric key unwrap failed")]
    KeyUnwrap,

    /// The symmetric stage failed: the recovered key, IV, ciphertext,
    /// padding, or decoded text was invalid.
    #[error("payload decryption failed: {reason}")]
    Payload {
        /// Which decode step rejected the payload.
        reason: String,
    },
}

impl DecryptFailure {
    /// Display sentinel substituted for the plaintext of a message
    /// that could not be decrypted.
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::KeyUnwrap => "[decryption failed: key unwrap]",
            Self::Payload { .. } => "[decryption failed: invalid data]",
        }
    }
}

// ---------------------------------------------------------------------------
// Seal
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` for one recipient.
///
/// # Steps
///
/// 1. Generate a fresh 256-bit AES key and 128-bit IV from OS entropy.
/// 2. AES-256-CBC/PKCS#7 encrypt the plaintext; Base64 the result.
/// 3. Base64 the AES key and wrap those ASCII bytes under the
///    recipient's RSA key (PKCS#1 v1.5); Base64 the wrap.
///
/// Two calls with identical input produce entirely different output:
/// key, IV, and therefore ciphertext are fresh per call.
///
/// # Errors
///
/// [`WhisperlinkError::Crypto`] if the RSA wrap fails. The symmetric
/// stage cannot fail for valid key/IV lengths, which are fixed here.
pub fn seal_for_peer(plaintext: &str, recipient: &PeerPublicKey) -> Result<SealedMessage> {
    // 1. Fresh symmetric key + IV.
    let mut key = [0u8; SYMMETRIC_KEY_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut key);
    OsRng.fill_bytes(&mut iv);

    // 2. Symmetric bulk encryption.
    let ciphertext_bytes = Aes256CbcEnc::new(&key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

    // 3. Wrap the (Base64-encoded) key under the recipient's RSA key.
    let key_b64 = BASE64.encode(key);
    let wrapped = recipient
        .as_rsa()
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, key_b64.as_bytes())
        .map_err(|e| WhisperlinkError::Crypto {
            reason: format!("RSA key wrap failed: {e}"),
        })?;

    Ok(SealedMessage {
        ciphertext: BASE64.encode(ciphertext_bytes),
        iv: BASE64.encode(iv),
        encrypted_symmetric_key: BASE64.encode(wrapped),
    })
}

// ---------------------------------------------------------------------------
// Open
// ---------------------------------------------------------------------------

/// Decrypts the three envelope fields with the local private key.
///
/// # Failure stages
///
/// - [`DecryptFailure::KeyUnwrap`] — the RSA unwrap rejected the
///   wrapped key (wrong key, corrupted data).
/// - [`DecryptFailure::Payload`] — the recovered key, IV, ciphertext,
///   padding, or UTF-8 decode was invalid.
///
/// Failures are returned, never panicked or escalated; a garbled
/// message must not take down the event loop.
pub fn open_sealed(
    ciphertext: &str,
    iv: &str,
    encrypted_symmetric_key: &str,
    identity: &Identity,
) -> std::result::Result<String, DecryptFailure> {
    // Stage 1: unwrap the symmetric key.
    let wrapped = BASE64
        .decode(encrypted_symmetric_key)
        .map_err(|_| DecryptFailure::KeyUnwrap)?;
    let key_b64_bytes = identity
        .private_key()
        .decrypt(Pkcs1v15Encrypt, &wrapped)
        .map_err(|_| DecryptFailure::KeyUnwrap)?;

    // Stage 2: decode the recovered key and decrypt the payload.
    let key_b64 = std::str::from_utf8(&key_b64_bytes).map_err(|_| DecryptFailure::Payload {
        reason: "recovered key is not ASCII".into(),
    })?;
    let key = BASE64.decode(key_b64).map_err(|_| DecryptFailure::Payload {
        reason: "recovered key is not valid Base64".into(),
    })?;
    if key.len() != SYMMETRIC_KEY_LEN {
        return Err(DecryptFailure::Payload {
            reason: format!("recovered key has {} bytes, expected {SYMMETRIC_KEY_LEN}", key.len()),
        });
    }

    let iv_bytes = BASE64.decode(iv).map_err(|_| DecryptFailure::Payload {
        reason: "IV is not valid Base64".into(),
    })?;
    let ciphertext_bytes = BASE64.decode(ciphertext).map_err(|_| DecryptFailure::Payload {
        reason: "ciphertext is not valid Base64".into(),
    })?;

    let plaintext_bytes = Aes256CbcDec::new_from_slices(&key, &iv_bytes)
        .map_err(|_| DecryptFailure::Payload {
            reason: format!("IV has {} bytes, expected {IV_LEN}", iv_bytes.len()),
        })?
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext_bytes)
        .map_err(|_| DecryptFailure::Payload {
            reason: "bad ciphertext length or padding".into(),
        })?;

    String::from_utf8(plaintext_bytes).map_err(|_| DecryptFailure::Payload {
        reason: "decrypted payload is not valid UTF-8".into(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
