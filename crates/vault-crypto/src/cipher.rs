//! RSA-OAEP field cipher
//!
//! Encrypts single short strings under the public key and renders the
//! ciphertext as standard base64 so it fits a text column. Padding is OAEP
//! with SHA-256 for both the digest and MGF1, and an empty label.

use anyhow::anyhow;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use vault_core::{KeyConfig, Result, VaultError};

use crate::keys::{private_key_from_pem, public_key_from_pem, read_private_key, read_public_key};

/// SHA-256 digest length in bytes
const DIGEST_LEN: usize = 32;

/// Largest plaintext OAEP-SHA256 can seal under a modulus of `modulus_bytes`
///
/// 190 bytes for a 2048-bit key.
pub fn oaep_max_plaintext(modulus_bytes: usize) -> usize {
    modulus_bytes.saturating_sub(2 * DIGEST_LEN + 2)
}

/// Encrypt a plaintext field and encode it as base64
///
/// Inputs longer than the key's OAEP bound fail with `PlaintextTooLarge`;
/// nothing is truncated.
pub fn encrypt_field(public_key: &RsaPublicKey, plaintext: &str) -> Result<String> {
    let max = oaep_max_plaintext(public_key.size());
    let len = plaintext.len();
    if len > max {
        return Err(VaultError::PlaintextTooLarge { len, max });
    }

    let ciphertext = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| VaultError::Other(anyhow!("Encryption failed: {e}")))?;

    Ok(STANDARD.encode(ciphertext))
}

/// Decode and decrypt a base64 ciphertext field
pub fn decrypt_field(private_key: &RsaPrivateKey, ciphertext: &str) -> Result<String> {
    let raw = STANDARD
        .decode(ciphertext)
        .map_err(|e| VaultError::DecryptionFailed(format!("Ciphertext is not base64: {e}")))?;

    let plaintext = private_key
        .decrypt(Oaep::new::<Sha256>(), &raw)
        .map_err(|e| VaultError::DecryptionFailed(e.to_string()))?;

    String::from_utf8(plaintext)
        .map_err(|_| VaultError::DecryptionFailed("Plaintext is not valid UTF-8".to_string()))
}

// ============================================================================
// Field Cipher
// ============================================================================

/// Key holder for the write and read paths
///
/// A writer only needs the public key. Decryption requires the private key
/// and fails with `KeyUnavailable` when it was not configured.
#[derive(Clone)]
pub struct FieldCipher {
    public_key: Option<RsaPublicKey>,
    private_key: Option<RsaPrivateKey>,
}

impl FieldCipher {
    /// Create a cipher from already-parsed keys
    ///
    /// When only the private key is given, the public half is derived from it.
    pub fn new(public_key: Option<RsaPublicKey>, private_key: Option<RsaPrivateKey>) -> Self {
        let public_key = public_key.or_else(|| private_key.as_ref().map(RsaPublicKey::from));
        Self {
            public_key,
            private_key,
        }
    }

    /// Cipher for a writer holding only the public key
    pub fn encrypt_only(public_key: RsaPublicKey) -> Self {
        Self::new(Some(public_key), None)
    }

    /// Parse PEM key material
    pub fn from_pem(
        public_pem: Option<&str>,
        private_pem: Option<&str>,
        password: Option<&str>,
    ) -> Result<Self> {
        let public_key = public_pem.map(public_key_from_pem).transpose()?;
        let private_key = private_pem
            .map(|pem| private_key_from_pem(pem, password))
            .transpose()?;
        Ok(Self::new(public_key, private_key))
    }

    /// Load keys from the configured file paths
    pub fn from_config(config: &KeyConfig) -> Result<Self> {
        let public_key = config
            .public_key_path
            .as_deref()
            .map(read_public_key)
            .transpose()?;
        let private_key = config
            .private_key_path
            .as_deref()
            .map(|path| read_private_key(path, config.private_key_password.as_deref()))
            .transpose()?;

        if public_key.is_none() && private_key.is_none() {
            return Err(VaultError::KeyUnavailable(
                "Neither a public nor a private key path is configured".to_string(),
            ));
        }

        tracing::info!(
            can_decrypt = private_key.is_some(),
            "Loaded field encryption keys"
        );
        Ok(Self::new(public_key, private_key))
    }

    /// Whether this cipher can decrypt stored fields
    pub fn can_decrypt(&self) -> bool {
        self.private_key.is_some()
    }

    /// Largest plaintext the configured public key can encrypt
    pub fn max_plaintext_len(&self) -> Result<usize> {
        Ok(oaep_max_plaintext(self.public_key()?.size()))
    }

    /// Encrypt a field under the public key
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        encrypt_field(self.public_key()?, plaintext)
    }

    /// Decrypt a field with the private key
    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        decrypt_field(self.private_key()?, ciphertext)
    }

    /// Fail with `KeyUnavailable` unless the private key is present
    pub fn require_private_key(&self) -> Result<()> {
        self.private_key().map(|_| ())
    }

    fn public_key(&self) -> Result<&RsaPublicKey> {
        self.public_key.as_ref().ok_or_else(|| {
            VaultError::KeyUnavailable("No public key configured for encryption".to_string())
        })
    }

    fn private_key(&self) -> Result<&RsaPrivateKey> {
        self.private_key.as_ref().ok_or_else(|| {
            VaultError::KeyUnavailable("No private key configured for decryption".to_string())
        })
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldCipher")
            .field("can_encrypt", &self.public_key.is_some())
            .field("can_decrypt", &self.private_key.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oaep_bound_for_common_key_sizes() {
        assert_eq!(oaep_max_plaintext(256), 190);
        assert_eq!(oaep_max_plaintext(128), 62);
        assert_eq!(oaep_max_plaintext(512), 446);
        assert_eq!(oaep_max_plaintext(10), 0);
    }

    #[test]
    fn test_empty_cipher_reports_missing_keys() {
        let cipher = FieldCipher::new(None, None);
        assert!(!cipher.can_decrypt());
        assert!(matches!(
            cipher.encrypt("name"),
            Err(VaultError::KeyUnavailable(_))
        ));
        assert!(matches!(
            cipher.decrypt("bmFtZQ=="),
            Err(VaultError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn test_from_config_without_paths_is_unavailable() {
        let err = FieldCipher::from_config(&KeyConfig::default()).unwrap_err();
        assert!(matches!(err, VaultError::KeyUnavailable(_)));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let rendered = format!("{:?}", FieldCipher::new(None, None));
        assert_eq!(
            rendered,
            "FieldCipher { can_encrypt: false, can_decrypt: false }"
        );
    }
}
