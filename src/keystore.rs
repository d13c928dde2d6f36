//! Keystore access: resolving the active wallet and decrypting key material.
//!
//! "No wallet configured" and "wrong password" are expected control flow, so
//! both are modeled as tagged results instead of errors. The caller decides
//! what to do with `NeedsOnboarding` (typically a one-time redirect to the
//! onboarding surface) and with `InvalidPassword` (re-prompt).

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::{
    encryptor,
    error::{Error, Result},
    storage::{self, Storage},
    wallet::{Jwk, KeyMaterial, StoredKeyfile, StoredWallet},
};

#[derive(Debug)]
pub enum ActiveWallet {
    Ok(StoredWallet),
    NeedsOnboarding,
}

pub enum DecryptOutcome {
    Ok(KeyMaterial),
    InvalidPassword,
}

/// Capability handed to the signing pipeline instead of ambient global state.
pub trait KeystoreProvider: Send + Sync {
    fn resolve_active(&self) -> Result<ActiveWallet>;

    /// Unlocks the wallet's encrypted keyfile with the password. A plain
    /// keyfile has no password to verify and is rejected here; callers read
    /// it through [`StoredWallet::plain_keyfile`] instead.
    fn decrypt(&self, wallet: &StoredWallet, password: &SecretString) -> Result<DecryptOutcome>;
}

/// Keystore backed by the persistent extension storage.
pub struct StorageKeystore<'a> {
    storage: &'a Storage,
}

impl<'a> StorageKeystore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn insert_wallet(&self, wallet: StoredWallet) -> Result<()> {
        let mut wallets = self.wallets()?;
        wallets.insert(wallet.address.clone(), wallet);
        self.storage
            .set(storage::WALLETS, &wallets)
            .map_err(Error::Unknown)
    }

    pub fn set_active(&self, address: &str) -> Result<()> {
        self.storage
            .set(storage::ACTIVE_ADDRESS, &address)
            .map_err(Error::Unknown)
    }

    fn wallets(&self) -> Result<HashMap<String, StoredWallet>> {
        Ok(self
            .storage
            .get::<HashMap<String, StoredWallet>>(storage::WALLETS)
            .map_err(Error::Unknown)?
            .unwrap_or_default())
    }
}

impl KeystoreProvider for StorageKeystore<'_> {
    fn resolve_active(&self) -> Result<ActiveWallet> {
        let wallets = self.wallets()?;
        if wallets.is_empty() {
            return Ok(ActiveWallet::NeedsOnboarding);
        }

        let active = self
            .storage
            .get::<String>(storage::ACTIVE_ADDRESS)
            .map_err(Error::Unknown)?;
        let Some(address) = active else {
            return Ok(ActiveWallet::NeedsOnboarding);
        };

        match wallets.get(&address) {
            Some(wallet) => Ok(ActiveWallet::Ok(wallet.clone())),
            None => Err(Error::Unknown(format!(
                "active address {} has no wallet record",
                address
            ))),
        }
    }

    fn decrypt(&self, wallet: &StoredWallet, password: &SecretString) -> Result<DecryptOutcome> {
        let keyfile = wallet
            .keyfile
            .as_ref()
            .ok_or(Error::UnsupportedWalletType("key material access"))?;

        match keyfile {
            StoredKeyfile::Plain { .. } => Err(Error::InvalidInput(
                "keyfile is not password protected".to_string(),
            )),
            StoredKeyfile::Encrypted { envelope } => {
                let mut plaintext =
                    match encryptor::decrypt(envelope, password.expose_secret().as_bytes()) {
                        Ok(bytes) => bytes,
                        Err(Error::InvalidPassword) => return Ok(DecryptOutcome::InvalidPassword),
                        Err(e) => return Err(e),
                    };
                let jwk = serde_json::from_slice::<Jwk>(&plaintext)
                    .map_err(|e| Error::Unknown(format!("stored keyfile is not a JWK: {}", e)));
                plaintext.zeroize();
                Ok(DecryptOutcome::Ok(KeyMaterial::new(jwk?)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::WalletType;

    fn temp_storage() -> Storage {
        let dir = tempfile::tempdir().unwrap();
        Storage::new(dir.keep().join("storage.json"))
    }

    fn test_jwk() -> Jwk {
        Jwk {
            kty: "RSA".to_string(),
            n: "bW9kdWx1cw".to_string(),
            e: "AQAB".to_string(),
            d: "ZA".to_string(),
            p: "cA".to_string(),
            q: "cQ".to_string(),
            dp: "ZHA".to_string(),
            dq: "ZHE".to_string(),
            qi: "cWk".to_string(),
        }
    }

    #[test]
    fn test_resolve_without_wallets_needs_onboarding() {
        let storage = temp_storage();
        let keystore = StorageKeystore::new(&storage);
        assert!(matches!(
            keystore.resolve_active().unwrap(),
            ActiveWallet::NeedsOnboarding
        ));
    }

    #[test]
    fn test_resolve_active_wallet() {
        let storage = temp_storage();
        let keystore = StorageKeystore::new(&storage);
        keystore
            .insert_wallet(StoredWallet {
                address: "addr1".to_string(),
                wallet_type: WalletType::Local,
                keyfile: Some(StoredKeyfile::Plain { jwk: test_jwk() }),
                nickname: None,
            })
            .unwrap();
        keystore.set_active("addr1").unwrap();

        match keystore.resolve_active().unwrap() {
            ActiveWallet::Ok(wallet) => assert_eq!(wallet.address, "addr1"),
            ActiveWallet::NeedsOnboarding => panic!("expected active wallet"),
        }
    }

    #[test]
    fn test_decrypt_rejects_plain_keyfile() {
        let storage = temp_storage();
        let keystore = StorageKeystore::new(&storage);
        let wallet = StoredWallet {
            address: "addr1".to_string(),
            wallet_type: WalletType::Local,
            keyfile: Some(StoredKeyfile::Plain { jwk: test_jwk() }),
            nickname: None,
        };

        // A plaintext keyfile cannot verify a password; it must not come
        // back as if one had been checked.
        let result = keystore.decrypt(&wallet, &SecretString::from("anything"));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_decrypt_wrong_password_is_recoverable() {
        let storage = temp_storage();
        let keystore = StorageKeystore::new(&storage);
        let keyfile_json = serde_json::to_vec(&test_jwk()).unwrap();
        let envelope = encryptor::encrypt(&keyfile_json, b"right horse").unwrap();
        let wallet = StoredWallet {
            address: "addr1".to_string(),
            wallet_type: WalletType::Local,
            keyfile: Some(StoredKeyfile::Encrypted { envelope }),
            nickname: None,
        };

        let outcome = keystore
            .decrypt(&wallet, &SecretString::from("battery staple"))
            .unwrap();
        assert!(matches!(outcome, DecryptOutcome::InvalidPassword));

        let outcome = keystore
            .decrypt(&wallet, &SecretString::from("right horse"))
            .unwrap();
        match outcome {
            DecryptOutcome::Ok(material) => {
                assert_eq!(material.jwk().owner(), "bW9kdWx1cw");
                material.release();
            }
            DecryptOutcome::InvalidPassword => panic!("expected decrypted material"),
        }
    }
}
