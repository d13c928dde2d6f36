//! Envelope encryption for stored key material.
//!
//! Two-layer scheme: a random DEK (Data Encryption Key) encrypts the keyfile,
//! a KEK (Key Encryption Key) derived from the password via Argon2 wraps the
//! DEK. AES-256-GCM provides the authenticated encryption on both layers, so
//! a wrong password fails the auth tag check instead of yielding garbage.
//!
//! # Storage format
//! - `ciphertext`: [12 bytes dek_nonce][variable encrypted_keyfile]
//! - `wrapped_key`: [12 bytes kek_nonce][48 bytes wrapped_dek]
//! - `kdf_salt`: 32 bytes for the Argon2 KDF

use aes_gcm::Aes256Gcm;
use aes_gcm::aead::{Aead, KeyInit};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const NONCE_SIZE: usize = 12;
pub const KEY_SIZE: usize = 32;
pub const SALT_SIZE: usize = 32;

/// Encrypted key material as persisted in the wallet collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ciphertext: Vec<u8>,
    pub wrapped_key: Vec<u8>,
    pub kdf_salt: Vec<u8>,
}

pub fn encrypt(plaintext: &[u8], password: &[u8]) -> Result<Envelope> {
    let dek = rand::random::<[u8; KEY_SIZE]>();
    let dek_nonce = rand::random::<[u8; NONCE_SIZE]>();
    let kek_nonce = rand::random::<[u8; NONCE_SIZE]>();
    let kdf_salt = rand::random::<[u8; SALT_SIZE]>();
    let kek = derive_kek(password, &kdf_salt)?;
    let data_ciphertext = aes_encrypt(&dek, &dek_nonce, plaintext)?;
    let wrapped_dek = aes_encrypt(&kek, &kek_nonce, &dek)?;

    // Format: [dek_nonce][data_ciphertext]
    let mut ciphertext = dek_nonce.to_vec();
    // Format: [kek_nonce][wrapped_dek]
    let mut wrapped_key = kek_nonce.to_vec();
    ciphertext.extend_from_slice(&data_ciphertext);
    wrapped_key.extend_from_slice(&wrapped_dek);

    Ok(Envelope {
        ciphertext,
        wrapped_key,
        kdf_salt: kdf_salt.to_vec(),
    })
}

/// Unwraps the DEK with the password-derived KEK and decrypts the keyfile.
/// Any authentication failure on either layer surfaces as `InvalidPassword`.
pub fn decrypt(envelope: &Envelope, password: &[u8]) -> Result<Vec<u8>> {
    let kek = derive_kek(password, &envelope.kdf_salt)?;
    if envelope.wrapped_key.len() < NONCE_SIZE {
        return Err(Error::Unknown("invalid wrapped_key format".to_string()));
    }
    let (kek_nonce_slice, wrapped_dek) = envelope.wrapped_key.split_at(NONCE_SIZE);
    let kek_nonce: [u8; NONCE_SIZE] = kek_nonce_slice
        .try_into()
        .map_err(|_| Error::Unknown("invalid KEK nonce".to_string()))?;
    let dek_bytes =
        aes_decrypt(&kek, &kek_nonce, wrapped_dek).map_err(|_| Error::InvalidPassword)?;
    let dek: [u8; KEY_SIZE] = dek_bytes
        .as_slice()
        .try_into()
        .map_err(|_| Error::Unknown("invalid DEK size".to_string()))?;
    if envelope.ciphertext.len() < NONCE_SIZE {
        return Err(Error::Unknown("invalid ciphertext format".to_string()));
    }
    let (dek_nonce_slice, data_ciphertext) = envelope.ciphertext.split_at(NONCE_SIZE);
    let dek_nonce: [u8; NONCE_SIZE] = dek_nonce_slice
        .try_into()
        .map_err(|_| Error::Unknown("invalid DEK nonce".to_string()))?;
    let plaintext =
        aes_decrypt(&dek, &dek_nonce, data_ciphertext).map_err(|_| Error::InvalidPassword)?;
    Ok(plaintext)
}

fn derive_kek(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_SIZE]> {
    let mut kek = [0u8; KEY_SIZE];
    argon2::Argon2::default()
        .hash_password_into(password, salt, &mut kek)
        .map_err(|e| Error::Unknown(format!("KDF failed: {:?}", e)))?;
    Ok(kek)
}

fn aes_encrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(&(*key).into());
    cipher
        .encrypt(&(*nonce).into(), plaintext)
        .map_err(|e| Error::Unknown(format!("AES-GCM encryption failed: {:?}", e)))
}

fn aes_decrypt(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(&(*key).into());
    cipher
        .decrypt(&(*nonce).into(), ciphertext)
        .map_err(|_| Error::InvalidPassword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_keyfile() {
        let plaintext = br#"{"kty":"RSA","n":"abc","e":"AQAB"}"#;
        let password = b"my_secure_password";
        let envelope = encrypt(plaintext, password).unwrap();
        let decrypted = decrypt(&envelope, password).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_wrong_password() {
        let plaintext = b"secret data";
        let envelope = encrypt(plaintext, b"correct_password").unwrap();
        let result = decrypt(&envelope, b"wrong_password");
        assert!(matches!(result, Err(Error::InvalidPassword)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let plaintext = b"secret data";
        let password = b"password";
        let mut envelope = encrypt(plaintext, password).unwrap();
        envelope.ciphertext[20] ^= 0xFF;
        let result = decrypt(&envelope, password);
        assert!(matches!(result, Err(Error::InvalidPassword)));
    }

    #[test]
    fn test_envelope_roundtrips_through_json() {
        let envelope = encrypt(b"keyfile bytes", b"password").unwrap();
        let json = serde_json::to_string(&envelope).unwrap();
        let restored: Envelope = serde_json::from_str(&json).unwrap();
        assert_eq!(envelope, restored);
    }
}
