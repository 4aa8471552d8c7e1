//! Vault Crypto - Field-level encryption for confidential attributes
//!
//! Only an agent's `name` and `description` are encrypted. The write path
//! needs nothing but the RSA public key; decrypting search results requires
//! the private key. Equality lookups on names go through a keyed hash.

pub mod cipher;
pub mod keys;
pub mod lookup;

pub use cipher::{decrypt_field, encrypt_field, oaep_max_plaintext, FieldCipher};
pub use keys::{private_key_from_pem, public_key_from_pem, read_private_key, read_public_key};
pub use lookup::NameLookup;

// Re-exported so callers can hold parsed keys without a direct rsa dependency
pub use rsa::{RsaPrivateKey, RsaPublicKey};
