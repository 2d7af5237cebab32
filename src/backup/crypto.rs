use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keyring::Entry;
use rand::RngCore;

use crate::error::{CoreError, CoreResult};

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const SERVICE: &str = "disk-cleanup-core";
const ACCOUNT: &str = "backup-encryption-key";

/// Authenticated encryption over backup payloads: AES-256-GCM, wire format
/// `nonce(12B) || ciphertext || tag(16B)`. The symmetric key lives in the
/// OS keychain via the `keyring` crate.
pub struct BackupCipher {
    cipher: Aes256Gcm,
}

impl BackupCipher {
    /// Loads the process-wide key from the OS keychain, generating and
    /// persisting one on first use.
    pub fn load_or_create() -> CoreResult<Self> {
        let entry = Entry::new(SERVICE, ACCOUNT).map_err(keyring_error)?;
        let key_bytes = match entry.get_password() {
            Ok(encoded) => STANDARD.decode(encoded).map_err(|e| CoreError::Crypto(e.to_string()))?,
            Err(keyring::Error::NoEntry) => {
                let mut bytes = vec![0u8; KEY_LEN];
                rand::rngs::OsRng.fill_bytes(&mut bytes);
                entry
                    .set_password(&STANDARD.encode(&bytes))
                    .map_err(keyring_error)?;
                bytes
            }
            Err(err) => return Err(keyring_error(err)),
        };
        Self::from_key_bytes(&key_bytes)
    }

    /// Builds a cipher from raw key bytes, bypassing the keychain. Used by
    /// tests and by callers that manage the key material themselves.
    pub fn from_key_bytes(key_bytes: &[u8]) -> CoreResult<Self> {
        if key_bytes.len() != KEY_LEN {
            return Err(CoreError::Crypto("stored key has unexpected length".into()));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(BackupCipher {
            cipher: Aes256Gcm::new(key),
        })
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> CoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CoreError::Crypto(e.to_string()))?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn decrypt(&self, blob: &[u8]) -> CoreResult<Vec<u8>> {
        if blob.len() < NONCE_LEN {
            return Err(CoreError::Crypto("ciphertext shorter than nonce".into()));
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CoreError::Crypto(e.to_string()))
    }
}

fn keyring_error(err: keyring::Error) -> CoreError {
    CoreError::Crypto(format!("keychain access failed: {err}"))
}
