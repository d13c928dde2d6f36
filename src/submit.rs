//! Signed transaction submission.
//!
//! Token interactions register with the Warp sequencer, a fixed endpoint
//! with no fallback. Native transfers broadcast to the active gateway,
//! racing a hard 10 second timeout; on failure they retry exactly once
//! against the fallback gateway. The signature is gateway-independent, so
//! the fallback reuses it as-is.

use std::sync::Arc;

use serde_json::json;
use tokio::time::timeout;

use crate::{
    analytics::{self, EventSink, EventType},
    config::SUBMIT_TIMEOUT,
    error::{Error, Result},
    gateway::{Gateway, GatewayApi},
    storage::{self, Storage},
    tx::{Transaction, builder::TransferKind, winston_to_ar},
    utils,
    wallet::owner_to_address,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionResult {
    pub id: String,
    pub fallback_used: bool,
}

pub struct Submitter<'a, G: GatewayApi> {
    api: &'a G,
    storage: &'a Storage,
    events: Arc<dyn EventSink>,
}

impl<'a, G: GatewayApi> Submitter<'a, G> {
    pub fn new(api: &'a G, storage: &'a Storage, events: Arc<dyn EventSink>) -> Self {
        Self {
            api,
            storage,
            events,
        }
    }

    /// One submission attempt against one endpoint.
    ///
    /// The native path is a first-to-settle race between the broadcast and
    /// the timeout; the losing broadcast future is dropped and can never
    /// touch the returned result.
    pub async fn submit(
        &self,
        tx: &Transaction,
        gateway: &Gateway,
        kind: TransferKind,
    ) -> Result<()> {
        match kind {
            TransferKind::Token => self.api.register_sequencer(tx).await,
            TransferKind::Native => {
                match timeout(SUBMIT_TIMEOUT, self.api.post_transaction(gateway, tx)).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::Submission(format!(
                        "timeout: posting to {} took more than {} seconds",
                        gateway,
                        SUBMIT_TIMEOUT.as_secs()
                    ))),
                }
            }
        }
    }

    /// Full submission semantics: snapshot cache, primary attempt, one
    /// fallback retry on the native path, analytics events off the critical
    /// path. Exactly one terminal error reaches the caller.
    pub async fn broadcast(
        &self,
        tx: &Transaction,
        gateway: &Gateway,
        fallback: &Gateway,
        kind: TransferKind,
    ) -> Result<SubmissionResult> {
        self.cache_latest(tx);

        let mut fallback_used = false;
        if let Err(primary_err) = self.submit(tx, gateway, kind).await {
            if kind != TransferKind::Native {
                return Err(primary_err);
            }

            tracing::warn!(
                error = %primary_err,
                gateway = %gateway,
                "broadcast failed, retrying against fallback gateway"
            );
            match self.submit(tx, fallback, kind).await {
                Ok(()) => {
                    analytics::emit(&self.events, EventType::Fallback);
                    fallback_used = true;
                }
                Err(fallback_err) => {
                    tracing::error!(error = %fallback_err, "fallback broadcast failed");
                    analytics::emit(&self.events, EventType::TransactionIncomplete);
                    return Err(fallback_err);
                }
            }
        }

        analytics::emit(&self.events, EventType::TransactionSent);
        Ok(SubmissionResult {
            id: tx.id.clone(),
            fallback_used,
        })
    }

    /// Local snapshot of the outgoing transaction for later display.
    /// Best effort: failures are logged, never surfaced.
    fn cache_latest(&self, tx: &Transaction) {
        let snapshot = json!({
            "quantity": { "ar": winston_to_ar(&tx.quantity) },
            "owner": { "address": owner_to_address(&tx.owner).ok() },
            "recipient": tx.target,
            "fee": { "ar": tx.reward },
            "data": { "size": tx.data_len() },
            "timestamp": utils::now(),
            "tags": tx
                .decoded_tags()
                .unwrap_or_default()
                .into_iter()
                .map(|(name, value)| json!({ "name": name, "value": value }))
                .collect::<Vec<_>>(),
        });
        if let Err(error) = self.storage.set(storage::LATEST_TX, &snapshot) {
            tracing::warn!(%error, "failed to cache latest transaction snapshot");
        }
    }
}
