//! Cryptographic operations for the Whisperlink client.
//!
//! This crate is the **sole** location for all cryptographic
//! operations. No other crate in the workspace may perform raw
//! crypto directly.
//!
//! # Modules
//!
//! - [`identity`] — RSA-2048 identity keypair generation and PEM
//!   export/import
//! - [`hybrid`] — per-message hybrid encryption (fresh AES-256-CBC
//!   key wrapped under the recipient's RSA key)

pub mod hybrid;
pub mod identity;
