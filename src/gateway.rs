//! Gateway access: endpoint model, HTTP client and resolver seam.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    config::CONFIG,
    error::{Error, Result},
    tx::Transaction,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl Gateway {
    pub fn new(protocol: &str, host: &str, port: u16) -> Self {
        Self {
            protocol: protocol.to_string(),
            host: host.to_string(),
            port,
        }
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// Network operations the pipeline performs against a gateway. Injected so
/// the submission and build stages can be exercised without the network.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Recent block anchor for the `last_tx` field.
    async fn tx_anchor(&self, gateway: &Gateway) -> Result<String>;

    /// Reward quote in winston for a payload of `data_len` bytes to `target`.
    async fn price(&self, gateway: &Gateway, data_len: usize, target: &str) -> Result<String>;

    /// Native balance in winston.
    async fn wallet_balance(&self, gateway: &Gateway, address: &str) -> Result<String>;

    /// Broadcasts a signed transaction to the gateway.
    async fn post_transaction(&self, gateway: &Gateway, tx: &Transaction) -> Result<()>;

    /// Registers a token interaction with the Warp sequencer. Not
    /// gateway-specific: the endpoint is fixed.
    async fn register_sequencer(&self, tx: &Transaction) -> Result<()>;
}

/// Picks the gateway pair to submit through.
pub trait GatewayResolver: Send + Sync {
    fn find_gateway(&self) -> Gateway;
    fn fallback_gateway(&self) -> Gateway;
}

/// Resolver backed by the static configuration.
pub struct StaticResolver;

impl GatewayResolver for StaticResolver {
    fn find_gateway(&self) -> Gateway {
        CONFIG.gateway.clone()
    }

    fn fallback_gateway(&self) -> Gateway {
        CONFIG.fallback_gateway.clone()
    }
}

pub struct HttpGatewayClient {
    client: reqwest::Client,
    sequencer_url: String,
}

impl HttpGatewayClient {
    pub fn new() -> Self {
        Self::with_sequencer_url(&CONFIG.warp_sequencer_url)
    }

    pub fn with_sequencer_url(sequencer_url: &str) -> Self {
        // Transport-level guard; the 10s submission race is enforced above.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("fail to create gateway HTTP client");
        Self {
            client,
            sequencer_url: sequencer_url.to_string(),
        }
    }

    async fn get_text(&self, url: String) -> Result<String> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::Unknown(format!("gateway request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::Unknown(format!(
                "gateway returned {} for {}",
                response.status(),
                url
            )));
        }
        response
            .text()
            .await
            .map_err(|e| Error::Unknown(format!("gateway response read failed: {}", e)))
    }
}

impl Default for HttpGatewayClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GatewayApi for HttpGatewayClient {
    async fn tx_anchor(&self, gateway: &Gateway) -> Result<String> {
        self.get_text(format!("{}/tx_anchor", gateway.url())).await
    }

    async fn price(&self, gateway: &Gateway, data_len: usize, target: &str) -> Result<String> {
        let url = if target.is_empty() {
            format!("{}/price/{}", gateway.url(), data_len)
        } else {
            format!("{}/price/{}/{}", gateway.url(), data_len, target)
        };
        self.get_text(url).await
    }

    async fn wallet_balance(&self, gateway: &Gateway, address: &str) -> Result<String> {
        self.get_text(format!("{}/wallet/{}/balance", gateway.url(), address))
            .await
    }

    async fn post_transaction(&self, gateway: &Gateway, tx: &Transaction) -> Result<()> {
        let url = format!("{}/tx", gateway.url());
        let response = self
            .client
            .post(&url)
            .json(tx)
            .send()
            .await
            .map_err(|e| Error::Submission(format!("broadcast to {} failed: {}", gateway, e)))?;
        if !response.status().is_success() {
            return Err(Error::Submission(format!(
                "gateway {} rejected transaction: {}",
                gateway,
                response.status()
            )));
        }
        Ok(())
    }

    async fn register_sequencer(&self, tx: &Transaction) -> Result<()> {
        let response = self
            .client
            .post(&self.sequencer_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(tx)
            .send()
            .await
            .map_err(|e| Error::Submission(format!("sequencer registration failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(Error::Submission(format!(
                "sequencer rejected transaction: {}",
                response.status()
            )));
        }
        // The sequencer replies with JSON; anything else is an upstream
        // anomaly we cannot classify further.
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| Error::Unknown(format!("unexpected sequencer response: {}", e)))?;
        Ok(())
    }
}
