//! Long-lived identity keys (RSA-2048).
//!
//! Each client generates one RSA keypair per session at connect time.
//! The public half is announced to the relay for distribution; the
//! private half never leaves this process and is dropped with the
//! session. There is no persistence and no rotation within a session.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

use whisperlink_types::{Result, WhisperlinkError};

/// RSA modulus size in bits for identity keys.
///
/// Generation failure at this size is fatal to the session; the key
/// size is never degraded as a fallback.
pub const RSA_KEY_BITS: usize = 2048;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The local user's RSA identity keypair.
///
/// Owns both halves of the keypair. Only the public half can be
/// exported (as SPKI PEM, via [`Identity::public_key_pem`]); the
/// private half is reachable solely by the hybrid cipher in this
/// crate.
pub struct Identity {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl Identity {
    /// Generates a fresh RSA-2048 keypair from OS entropy.
    ///
    /// Must be called exactly once per session, before any message is
    /// sent or received.
    ///
    /// # Errors
    ///
    /// [`WhisperlinkError::KeyGeneration`] if the keypair cannot be
    /// generated. This is fatal: no chat is possible without an
    /// identity.
    pub fn generate() -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(|e| {
            WhisperlinkError::KeyGeneration {
                reason: format!("RSA-{RSA_KEY_BITS} generation failed: {e}"),
            }
        })?;
        let public_key = RsaPublicKey::from(&private_key);

        tracing::debug!(bits = RSA_KEY_BITS, "identity keypair generated");

        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Exports the public half as an SPKI PEM string.
    ///
    /// This is the interchange form announced to the relay and stored
    /// by peers in their directories.
    pub fn public_key_pem(&self) -> Result<String> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| WhisperlinkError::Crypto {
                reason: format!("public key PEM export failed: {e}"),
            })
    }

    /// The private half, for the hybrid cipher's unwrap step.
    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// The public half, for wrap-to-self scenarios in tests.
    pub(crate) fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

// Identity intentionally implements neither Clone nor Debug to
// prevent accidental leakage of the private key in logs or copies.

// ---------------------------------------------------------------------------
// PeerPublicKey
// ---------------------------------------------------------------------------

/// A peer's announced RSA public key, parsed from PEM.
///
/// Stored in the peer directory and used to wrap per-message
/// symmetric keys for that peer.
#[derive(Clone, Debug, PartialEq)]
pub struct PeerPublicKey(RsaPublicKey);

impl PeerPublicKey {
    /// Parses a peer key from its SPKI PEM form.
    ///
    /// # Errors
    ///
    /// [`WhisperlinkError::Crypto`] if the PEM is malformed or does
    /// not contain an RSA public key.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let key = RsaPublicKey::from_public_key_pem(pem).map_err(|e| {
            WhisperlinkError::Crypto {
                reason: format!("peer public key PEM parse failed: {e}"),
            }
        })?;
        Ok(Self(key))
    }

    /// The underlying RSA key, for the hybrid cipher's wrap step.
    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl From<&Identity> for PeerPublicKey {
    /// Views the local identity's public half as a peer key.
    ///
    /// Used by tests and wrap-to-self scenarios; on the wire, peer
    /// keys always arrive as PEM.
    fn from(identity: &Identity) -> Self {
        Self(identity.public_key().clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
