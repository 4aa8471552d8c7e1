//! Keyed lookup hash for encrypted names
//!
//! OAEP ciphertexts are randomized, so an encrypted name can never be matched
//! by equality. Records carry an HMAC-SHA256 of the plaintext name instead,
//! keyed by a secret that storage readers do not hold.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt::Write as _;
use vault_core::{Result, VaultError};

type HmacSha256 = Hmac<Sha256>;

/// Keyed digest of plaintext names
#[derive(Clone)]
pub struct NameLookup {
    mac: HmacSha256,
}

impl NameLookup {
    /// Create a lookup from a non-empty secret
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(VaultError::ConfigError(
                "Name lookup secret must not be empty".to_string(),
            ));
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(secret)
            .map_err(|e| VaultError::ConfigError(format!("Invalid name lookup secret: {e}")))?;
        Ok(Self { mac })
    }

    /// Lowercase hex HMAC-SHA256 of the exact name bytes
    pub fn digest(&self, name: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(name.as_bytes());

        mac.finalize()
            .into_bytes()
            .iter()
            .fold(String::with_capacity(64), |mut out, byte| {
                let _ = write!(out, "{byte:02x}");
                out
            })
    }
}

impl std::fmt::Debug for NameLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameLookup").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_exact() {
        let lookup = NameLookup::new("pepper").unwrap();
        let digest = lookup.digest("Weather Agent");

        assert_eq!(digest.len(), 64);
        assert_eq!(digest, lookup.digest("Weather Agent"));
        assert_ne!(digest, lookup.digest("weather agent"));
        assert!(!digest.contains("Weather"));
    }

    #[test]
    fn test_digest_depends_on_secret() {
        let a = NameLookup::new("pepper").unwrap();
        let b = NameLookup::new("salt").unwrap();
        assert_ne!(a.digest("Weather Agent"), b.digest("Weather Agent"));
    }

    #[test]
    fn test_rfc4231_vector() {
        // RFC 4231 test case 2
        let lookup = NameLookup::new("Jefe").unwrap();
        assert_eq!(
            lookup.digest("what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            NameLookup::new(""),
            Err(VaultError::ConfigError(_))
        ));
    }
}
