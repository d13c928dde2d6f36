//! Token balance aggregation.
//!
//! Enrichment attaches live balances to the stored token list. Each token is
//! fetched independently and concurrently; a failing token keeps a `None`
//! balance while the rest of the list is unaffected. `None` means "not
//! fetched", which is distinct from a fetched balance of zero.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    config::{AO_NATIVE_TOKEN, CONFIG},
    error::{Error, Result},
    gateway::{Gateway, GatewayApi},
    storage::{self, Storage},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(rename = "processId")]
    pub process_id: String,
    pub name: String,
    pub ticker: String,
    #[serde(default)]
    pub balance: Option<String>,
}

/// Balance lookups, keyed by process id except for the native placeholder.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn native_balance(&self, address: &str) -> Result<String>;

    async fn process_balance(&self, address: &str, process_id: &str) -> Result<String>;
}

/// Enriches tokens with live balances.
///
/// Fetches run concurrently with no ordering guarantee among them; the
/// result preserves the input order. When `token_ids` is given, balances are
/// still fetched for the full list first and the filter is applied after
/// (fetch-then-filter, kept for parity with the original behavior).
pub async fn enrich<B: BalanceSource>(
    source: &B,
    tokens: Vec<TokenInfo>,
    address: &str,
    token_ids: Option<&[String]>,
) -> Vec<TokenInfo> {
    let fetches = tokens.into_iter().map(|mut token| async move {
        let result = if token.process_id == AO_NATIVE_TOKEN {
            source.native_balance(address).await
        } else {
            source.process_balance(address, &token.process_id).await
        };
        match result {
            Ok(balance) => token.balance = Some(balance),
            Err(error) => {
                tracing::error!(
                    %error,
                    token = %token.name,
                    process_id = %token.process_id,
                    "error fetching token balance"
                );
                token.balance = None;
            }
        }
        token
    });

    let enriched = join_all(fetches).await;

    match token_ids {
        None => enriched,
        Some(ids) => enriched
            .into_iter()
            .filter(|token| ids.iter().any(|id| id == &token.process_id))
            .collect(),
    }
}

/// Loads the tracked token list from storage and enriches it for the active
/// address. The stored list is the source of truth; `token_ids` narrows the
/// returned set after the fetch.
pub async fn user_tokens<B: BalanceSource>(
    source: &B,
    store: &Storage,
    token_ids: Option<&[String]>,
) -> Result<Vec<TokenInfo>> {
    let tokens = store
        .get::<Vec<TokenInfo>>(storage::AO_TOKENS)
        .map_err(Error::Unknown)?
        .unwrap_or_default();
    let address = store
        .get::<String>(storage::ACTIVE_ADDRESS)
        .map_err(Error::Unknown)?
        .ok_or(Error::NoWallets)?;
    Ok(enrich(source, tokens, &address, token_ids).await)
}

/// Balance source backed by the gateway (native) and an AO compute unit
/// dry-run (processes).
pub struct AoBalanceSource<'a, G: GatewayApi> {
    api: &'a G,
    gateway: Gateway,
    cu_url: String,
    client: reqwest::Client,
}

impl<'a, G: GatewayApi> AoBalanceSource<'a, G> {
    pub fn new(api: &'a G, gateway: Gateway) -> Self {
        Self {
            api,
            gateway,
            cu_url: CONFIG.ao_cu_url.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl<G: GatewayApi> BalanceSource for AoBalanceSource<'_, G> {
    async fn native_balance(&self, address: &str) -> Result<String> {
        self.api.wallet_balance(&self.gateway, address).await
    }

    async fn process_balance(&self, address: &str, process_id: &str) -> Result<String> {
        let url = format!("{}/dry-run?process-id={}", self.cu_url, process_id);
        let message = json!({
            "Id": "0000000000000000000000000000000000000000001",
            "Target": process_id,
            "Owner": address,
            "Data": "",
            "Tags": [
                { "name": "Action", "value": "Balance" },
                { "name": "Recipient", "value": address },
                { "name": "Data-Protocol", "value": "ao" },
                { "name": "Type", "value": "Message" },
                { "name": "Variant", "value": "ao.TN.1" },
            ],
        });

        let response = self
            .client
            .post(&url)
            .json(&message)
            .send()
            .await
            .map_err(|e| Error::Unknown(format!("dry-run request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::Unknown(format!(
                "compute unit returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::Unknown(format!("unexpected dry-run response: {}", e)))?;

        parse_dry_run_balance(&body)
            .ok_or_else(|| Error::Unknown("dry-run response carried no balance".to_string()))
    }
}

/// The balance comes back either as a `Balance` tag on the first reply
/// message or as its data payload.
fn parse_dry_run_balance(body: &serde_json::Value) -> Option<String> {
    let message = body.get("Messages")?.as_array()?.first()?;
    if let Some(tags) = message.get("Tags").and_then(|t| t.as_array()) {
        for tag in tags {
            if tag.get("name").and_then(|n| n.as_str()) == Some("Balance") {
                if let Some(value) = tag.get("value").and_then(|v| v.as_str()) {
                    return Some(value.to_string());
                }
            }
        }
    }
    message
        .get("Data")
        .and_then(|d| d.as_str())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct MockSource {
        native_calls: AtomicUsize,
        process_calls: AtomicUsize,
        failing: Vec<String>,
    }

    impl MockSource {
        fn new(failing: &[&str]) -> Self {
            Self {
                native_calls: AtomicUsize::new(0),
                process_calls: AtomicUsize::new(0),
                failing: failing.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl BalanceSource for MockSource {
        async fn native_balance(&self, _: &str) -> Result<String> {
            self.native_calls.fetch_add(1, Ordering::SeqCst);
            Ok("1000000000000".to_string())
        }

        async fn process_balance(&self, _: &str, process_id: &str) -> Result<String> {
            self.process_calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.iter().any(|id| id == process_id) {
                return Err(Error::Unknown("process unreachable".to_string()));
            }
            Ok(format!("{}00", process_id.len()))
        }
    }

    fn token(process_id: &str) -> TokenInfo {
        TokenInfo {
            process_id: process_id.to_string(),
            name: format!("{} token", process_id),
            ticker: process_id.to_uppercase(),
            balance: None,
        }
    }

    #[tokio::test]
    async fn test_enrich_empty() {
        let source = MockSource::new(&[]);
        let result = enrich(&source, Vec::new(), "addr", None).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_enrich_isolates_failures_by_position() {
        let source = MockSource::new(&["bad"]);
        let tokens = vec![token("aaa"), token("bad"), token("ccc")];
        let result = enrich(&source, tokens, "addr", None).await;

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].process_id, "aaa");
        assert!(result[0].balance.is_some());
        assert_eq!(result[1].process_id, "bad");
        assert!(result[1].balance.is_none());
        assert_eq!(result[2].process_id, "ccc");
        assert!(result[2].balance.is_some());
    }

    #[tokio::test]
    async fn test_native_placeholder_uses_native_lookup() {
        let source = MockSource::new(&[]);
        let tokens = vec![token(AO_NATIVE_TOKEN), token("xyz")];
        let result = enrich(&source, tokens, "addr", None).await;

        assert_eq!(source.native_calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.process_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result[0].balance.as_deref(), Some("1000000000000"));
    }

    #[tokio::test]
    async fn test_filter_fetches_full_list_first() {
        let source = MockSource::new(&[]);
        let tokens = vec![token("aaa"), token("bbb"), token("ccc")];
        let wanted = vec!["bbb".to_string()];
        let result = enrich(&source, tokens, "addr", Some(&wanted)).await;

        // fetch-then-filter: all three were fetched, one returned
        assert_eq!(source.process_calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].process_id, "bbb");
        assert!(result[0].balance.is_some());
    }

    fn temp_storage() -> Storage {
        let dir = tempfile::tempdir().unwrap();
        Storage::new(dir.keep().join("storage.json"))
    }

    #[tokio::test]
    async fn test_user_tokens_reads_stored_list() {
        let store = temp_storage();
        store
            .set(storage::AO_TOKENS, &vec![token("aaa"), token("bbb")])
            .unwrap();
        store
            .set(storage::ACTIVE_ADDRESS, &"addr".to_string())
            .unwrap();

        let source = MockSource::new(&[]);
        let result = user_tokens(&source, &store, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|t| t.balance.is_some()));
        assert_eq!(source.process_calls.load(Ordering::SeqCst), 2);

        let wanted = vec!["bbb".to_string()];
        let filtered = user_tokens(&source, &store, Some(&wanted)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].process_id, "bbb");
    }

    #[tokio::test]
    async fn test_user_tokens_without_active_address() {
        let store = temp_storage();
        store
            .set(storage::AO_TOKENS, &vec![token("aaa")])
            .unwrap();

        let source = MockSource::new(&[]);
        let result = user_tokens(&source, &store, None).await;
        assert!(matches!(result, Err(Error::NoWallets)));
    }

    #[tokio::test]
    async fn test_user_tokens_with_empty_store() {
        let store = temp_storage();
        store
            .set(storage::ACTIVE_ADDRESS, &"addr".to_string())
            .unwrap();

        let source = MockSource::new(&[]);
        let result = user_tokens(&source, &store, None).await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_dry_run_balance_prefers_tag() {
        let body = json!({
            "Messages": [{
                "Tags": [{ "name": "Balance", "value": "42" }],
                "Data": "99",
            }]
        });
        assert_eq!(parse_dry_run_balance(&body).as_deref(), Some("42"));

        let data_only = json!({ "Messages": [{ "Data": "99" }] });
        assert_eq!(parse_dry_run_balance(&data_only).as_deref(), Some("99"));

        let empty = json!({ "Messages": [] });
        assert!(parse_dry_run_balance(&empty).is_none());
    }
}
