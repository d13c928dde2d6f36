//! Message digesting and RSA-PSS signing.
//!
//! Arweave keyfiles are RSA keys; signatures are RSA-PSS with a fixed salt
//! length of 32 bytes. `sign_message` hashes the payload first and signs the
//! hash rather than the raw payload. Hashing twice ensures an app cannot
//! drain the user's wallet through the message-signing surface (credits to
//! Arweave.app); the double hash is part of the wire format and verifiers
//! depend on it.

use rsa::{BigUint, Pss, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256, Sha384, Sha512};

use crate::{
    analytics::NavigationSink,
    error::{Error, Result},
    keystore::{ActiveWallet, KeystoreProvider},
    utils::b64,
    wallet::Jwk,
};

/// PSS salt length used for every signature this wallet produces.
pub const PSS_SALT_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Parses the WebCrypto-style digest name. Anything unsupported is
    /// rejected before a single cryptographic operation runs.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "SHA-256" => Ok(Self::Sha256),
            "SHA-384" => Ok(Self::Sha384),
            "SHA-512" => Ok(Self::Sha512),
            other => Err(Error::InvalidInput(format!(
                "unsupported hash algorithm: {}",
                other
            ))),
        }
    }

    fn pss(self) -> Pss {
        match self {
            Self::Sha256 => Pss::new_with_salt::<Sha256>(PSS_SALT_LENGTH),
            Self::Sha384 => Pss::new_with_salt::<Sha384>(PSS_SALT_LENGTH),
            Self::Sha512 => Pss::new_with_salt::<Sha512>(PSS_SALT_LENGTH),
        }
    }
}

pub fn digest(alg: HashAlgorithm, data: &[u8]) -> Vec<u8> {
    match alg {
        HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
    }
}

#[derive(Debug, Clone)]
pub struct SignMessageOptions {
    pub hash_algorithm: String,
}

impl Default for SignMessageOptions {
    fn default() -> Self {
        Self {
            hash_algorithm: "SHA-256".to_string(),
        }
    }
}

/// An imported RSA signing key, parameterized by the digest it signs with.
pub struct SigningKey {
    key: RsaPrivateKey,
    alg: HashAlgorithm,
}

impl SigningKey {
    pub fn from_jwk(jwk: &Jwk, alg: HashAlgorithm) -> Result<Self> {
        let n = component(&jwk.n, "n")?;
        let e = component(&jwk.e, "e")?;
        let d = component(&jwk.d, "d")?;
        let p = component(&jwk.p, "p")?;
        let q = component(&jwk.q, "q")?;
        let key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| Error::Unknown(format!("failed to import signing key: {}", e)))?;
        Ok(Self { key, alg })
    }

    /// Signs `H(data)` with RSA-PSS. This is the single-hash primitive the
    /// transaction signature uses; `sign_message` layers one more digest on
    /// top of it.
    pub fn sign_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let hashed = digest(self.alg, data);
        self.key
            .sign_with_rng(&mut rand::thread_rng(), self.alg.pss(), &hashed)
            .map_err(|e| Error::Unknown(format!("signing failed: {}", e)))
    }

    pub fn public_key(&self) -> RsaPublicKey {
        self.key.to_public_key()
    }
}

/// Verifies a signature produced by [`SigningKey::sign_data`] over `data`.
pub fn verify_data(
    public_key: &RsaPublicKey,
    alg: HashAlgorithm,
    data: &[u8],
    signature: &[u8],
) -> bool {
    let hashed = digest(alg, data);
    public_key.verify(alg.pss(), &hashed, signature).is_ok()
}

/// Signs an arbitrary payload with the active wallet's key.
///
/// The payload is digested first and the digest is what gets signed.
/// Hardware wallets do not support message signing and are rejected before
/// the key is ever imported.
pub fn sign_message(
    keystore: &dyn KeystoreProvider,
    navigation: &dyn NavigationSink,
    payload: &[u8],
    options: &SignMessageOptions,
) -> Result<Vec<u8>> {
    let alg = HashAlgorithm::parse(&options.hash_algorithm)?;

    let hash = digest(alg, payload);

    let wallet = match keystore.resolve_active()? {
        ActiveWallet::Ok(wallet) => wallet,
        ActiveWallet::NeedsOnboarding => {
            // User-visible recoverable condition: send them to onboarding.
            navigation.open_onboarding();
            return Err(Error::NoWallets);
        }
    };

    if wallet.is_hardware() {
        return Err(Error::UnsupportedWalletType("signing messages currently"));
    }

    let jwk = wallet.plain_keyfile().ok_or_else(|| {
        Error::Unknown("active keyfile is password protected; unlock it first".to_string())
    })?;

    let key = SigningKey::from_jwk(jwk, alg)?;
    key.sign_data(&hash)
}

fn component(encoded: &str, name: &str) -> Result<BigUint> {
    let bytes = b64::decode(encoded)
        .map_err(|e| Error::InvalidInput(format!("invalid JWK component '{}': {}", name, e)))?;
    Ok(BigUint::from_bytes_be(&bytes))
}
