//! Confirm-send orchestration.
//!
//! Ties the pipeline together: take the staged transfer, resolve the active
//! wallet, build the transaction, obtain key material (with or without a
//! password prompt depending on the signature allowance), sign and submit.
//! Decrypted key material is owned exclusively by one call and released on
//! every exit path.

use std::sync::Arc;

use secrecy::SecretString;

use crate::{
    analytics::{EventSink, NavigationSink},
    error::{Error, Result},
    gateway::{GatewayApi, GatewayResolver},
    keystore::{ActiveWallet, DecryptOutcome, KeystoreProvider},
    session::{PendingTransfer, TempStorage},
    signer::{HashAlgorithm, SigningKey},
    storage::{self, Storage},
    submit::Submitter,
    tx::{
        Transaction,
        builder::{TransferKind, TransferRequest, TxFactory},
    },
    wallet::{KeyMaterial, StoredWallet},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SentTransfer {
    pub id: String,
    pub kind: TransferKind,
    pub fallback_used: bool,
}

pub struct WalletService<'a, K, G, R>
where
    K: KeystoreProvider,
    G: GatewayApi,
    R: GatewayResolver,
{
    keystore: &'a K,
    api: &'a G,
    resolver: &'a R,
    storage: &'a Storage,
    pending: &'a TempStorage,
    events: Arc<dyn EventSink>,
    navigation: Arc<dyn NavigationSink>,
}

impl<'a, K, G, R> WalletService<'a, K, G, R>
where
    K: KeystoreProvider,
    G: GatewayApi,
    R: GatewayResolver,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        keystore: &'a K,
        api: &'a G,
        resolver: &'a R,
        storage: &'a Storage,
        pending: &'a TempStorage,
        events: Arc<dyn EventSink>,
        navigation: Arc<dyn NavigationSink>,
    ) -> Self {
        Self {
            keystore,
            api,
            resolver,
            storage,
            pending,
            events,
            navigation,
        }
    }

    /// Consumes the staged transfer and runs it through build, sign and
    /// submit. The password is only required when the quantity reaches the
    /// signature allowance or the keyfile is stored encrypted.
    pub async fn confirm_send(&self, password: Option<SecretString>) -> Result<SentTransfer> {
        let pending = self
            .pending
            .take()
            .ok_or_else(|| Error::InvalidInput("no pending transfer staged".to_string()))?;

        let wallet = match self.keystore.resolve_active()? {
            ActiveWallet::Ok(wallet) => wallet,
            ActiveWallet::NeedsOnboarding => {
                self.navigation.open_onboarding();
                return Err(Error::NoWallets);
            }
        };
        if wallet.is_hardware() {
            return Err(Error::UnsupportedWalletType("sending transfers currently"));
        }

        let kind = TransferKind::of(&pending.token_id);
        let gateway = self.resolver.find_gateway();
        let request = TransferRequest {
            token_id: pending.token_id.clone(),
            quantity: pending.quantity,
            recipient: pending.recipient.clone(),
            message: pending.message.clone(),
        };
        let mut tx = TxFactory::new(self.api)
            .build_transfer(&gateway, &request)
            .await?;

        let material = self.obtain_key_material(&wallet, &pending, password)?;
        let result = self.sign_and_submit(&mut tx, &material, kind).await;
        // Release on success and failure alike; drop would zeroize too, but
        // the contract is explicit.
        material.release();

        let submission = result?;
        Ok(SentTransfer {
            id: submission.id,
            kind,
            fallback_used: submission.fallback_used,
        })
    }

    /// Below the signature allowance the stored plaintext keyfile is used
    /// without a prompt; otherwise the password unlocks the keystore.
    fn obtain_key_material(
        &self,
        wallet: &StoredWallet,
        pending: &PendingTransfer,
        password: Option<SecretString>,
    ) -> Result<KeyMaterial> {
        let allowance: u64 = self
            .storage
            .get(storage::SIGNATURE_ALLOWANCE)
            .map_err(Error::Unknown)?
            .unwrap_or(0);

        if pending.quantity < allowance {
            if let Some(jwk) = wallet.plain_keyfile() {
                return Ok(KeyMaterial::new(jwk.clone()));
            }
        }

        let password = password
            .ok_or_else(|| Error::InvalidInput("password required to sign this transfer".to_string()))?;
        match self.keystore.decrypt(wallet, &password)? {
            DecryptOutcome::Ok(material) => Ok(material),
            DecryptOutcome::InvalidPassword => Err(Error::InvalidPassword),
        }
    }

    async fn sign_and_submit(
        &self,
        tx: &mut Transaction,
        material: &KeyMaterial,
        kind: TransferKind,
    ) -> Result<crate::submit::SubmissionResult> {
        let jwk = material.jwk();
        tx.set_owner(jwk.owner())?;

        let key = SigningKey::from_jwk(jwk, HashAlgorithm::Sha256)?;
        let signature_data = tx.signature_data()?;
        let signature = key.sign_data(&signature_data)?;
        tx.set_signature(&signature)?;

        let submitter = Submitter::new(self.api, self.storage, self.events.clone());
        submitter
            .broadcast(
                tx,
                &self.resolver.find_gateway(),
                &self.resolver.fallback_gateway(),
                kind,
            )
            .await
    }
}
