//! Age encryption backend implementation.
//!
//! Encrypts to the deployment key's own x25519 recipient, so the key file is
//! all that is needed to seal and unseal.

use std::io::{Read, Write};

use ::age::x25519;
use tracing::trace;

use super::{Cipher, DeploymentKey};
use crate::error::{CipherError, Result};

/// Age-based cipher bound to one deployment key.
pub struct Age {
    identity: x25519::Identity,
}

impl Age {
    pub fn new(key: &DeploymentKey) -> Result<Self> {
        Ok(Self {
            identity: key.identity()?,
        })
    }
}

impl Cipher for Age {
    fn name(&self) -> &'static str {
        "age"
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        trace!(plaintext_len = plaintext.len(), "encrypting");

        let recipient = self.identity.to_public();
        let encryptor =
            age::Encryptor::with_recipients(std::iter::once(&recipient as &dyn age::Recipient))
                .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        let mut encrypted = Vec::new();
        let mut writer = encryptor
            .wrap_output(&mut encrypted)
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;
        writer.write_all(plaintext)?;
        writer
            .finish()
            .map_err(|e| CipherError::EncryptionFailed(format!("{}", e)))?;

        trace!(ciphertext_len = encrypted.len(), "encrypted");
        Ok(encrypted)
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting");

        let decryptor = age::Decryptor::new(ciphertext)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        let mut decrypted = Vec::new();
        let mut reader = decryptor
            .decrypt(std::iter::once(&self.identity as &dyn age::Identity))
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;
        reader
            .read_to_end(&mut decrypted)
            .map_err(|e| CipherError::DecryptionFailed(format!("{}", e)))?;

        trace!(plaintext_len = decrypted.len(), "decrypted");
        Ok(decrypted)
    }
}
