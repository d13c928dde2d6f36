//! Wallet records and key material.
//!
//! A stored wallet is identified by its address, which is derived from the
//! RSA public modulus. Local wallets carry their keyfile either in plaintext
//! or wrapped in an encryption envelope; hardware wallets carry no key
//! material at all.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    encryptor::Envelope,
    error::{Error, Result},
    utils::b64,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Local,
    Hardware,
}

/// RSA private key in JWK form, the format Arweave keyfiles ship in.
/// All components are base64url encoded.
#[derive(Clone, PartialEq, Serialize, Deserialize, Zeroize)]
pub struct Jwk {
    pub kty: String,
    pub n: String,
    pub e: String,
    pub d: String,
    pub p: String,
    pub q: String,
    pub dp: String,
    pub dq: String,
    pub qi: String,
}

impl Jwk {
    /// The public modulus, used verbatim as the transaction owner field.
    pub fn owner(&self) -> &str {
        &self.n
    }
}

// No Debug derive: a formatted Jwk would leak private components into logs.
impl std::fmt::Debug for Jwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwk").field("n", &self.n).finish_non_exhaustive()
    }
}

/// Decrypted key material. Single-owner for the duration of one signing
/// operation; the backing bytes are overwritten with zeroes on `release`
/// and again on drop, so every exit path of a signing call releases it.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial {
    jwk: Jwk,
}

impl KeyMaterial {
    pub fn new(jwk: Jwk) -> Self {
        Self { jwk }
    }

    pub fn jwk(&self) -> &Jwk {
        &self.jwk
    }

    /// Overwrites the backing storage with zero bytes and consumes the
    /// material. Dropping without calling this zeroizes as well.
    pub fn release(mut self) {
        self.zeroize();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoredKeyfile {
    Plain { jwk: Jwk },
    Encrypted { envelope: Envelope },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredWallet {
    pub address: String,
    #[serde(rename = "type")]
    pub wallet_type: WalletType,
    /// Present only for `local` wallets.
    pub keyfile: Option<StoredKeyfile>,
    pub nickname: Option<String>,
}

impl StoredWallet {
    pub fn is_hardware(&self) -> bool {
        self.wallet_type == WalletType::Hardware
    }

    /// Keyfile usable without a password prompt, if the wallet stores one.
    pub fn plain_keyfile(&self) -> Option<&Jwk> {
        match &self.keyfile {
            Some(StoredKeyfile::Plain { jwk }) => Some(jwk),
            _ => None,
        }
    }
}

/// Derives the wallet address from the owner modulus:
/// base64url(SHA-256(raw modulus bytes)).
pub fn owner_to_address(owner: &str) -> Result<String> {
    let modulus = b64::decode(owner)
        .map_err(|e| Error::InvalidInput(format!("invalid owner modulus: {}", e)))?;
    Ok(b64::encode(Sha256::digest(&modulus)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_to_address_shape() {
        let owner = b64::encode([7u8; 512]);
        let address = owner_to_address(&owner).unwrap();
        // 32-byte digest encodes to 43 chars without padding
        assert_eq!(address.len(), 43);
        assert_eq!(address, owner_to_address(&owner).unwrap());

        let other = b64::encode([8u8; 512]);
        assert_ne!(address, owner_to_address(&other).unwrap());
    }

    #[test]
    fn test_owner_to_address_rejects_garbage() {
        assert!(matches!(
            owner_to_address("not-base64url!!!"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_stored_wallet_keyfile_access() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            n: "bW9kdWx1cw".to_string(),
            e: "AQAB".to_string(),
            d: String::new(),
            p: String::new(),
            q: String::new(),
            dp: String::new(),
            dq: String::new(),
            qi: String::new(),
        };
        let wallet = StoredWallet {
            address: "addr".to_string(),
            wallet_type: WalletType::Local,
            keyfile: Some(StoredKeyfile::Plain { jwk: jwk.clone() }),
            nickname: None,
        };
        assert!(!wallet.is_hardware());
        assert_eq!(wallet.plain_keyfile(), Some(&jwk));

        let hardware = StoredWallet {
            address: "addr2".to_string(),
            wallet_type: WalletType::Hardware,
            keyfile: None,
            nickname: None,
        };
        assert!(hardware.is_hardware());
        assert!(hardware.plain_keyfile().is_none());
    }
}
