//! Test doubles for the send-flow tests.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use arclight::{
    analytics::{EventSink, EventType, NavigationSink},
    error::{Error, Result},
    gateway::{Gateway, GatewayApi, GatewayResolver},
    tx::Transaction,
    utils::b64,
};
use async_trait::async_trait;

#[derive(Default)]
pub struct MockGateway {
    pub posted: Mutex<Vec<(String, Transaction)>>,
    pub registered: Mutex<Vec<Transaction>>,
    pub fail_hosts: Vec<String>,
}

impl MockGateway {
    pub fn failing_on(hosts: &[&str]) -> Self {
        Self {
            fail_hosts: hosts.iter().map(|h| h.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn posted_to(&self, host: &str) -> Vec<Transaction> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _)| h == host)
            .map(|(_, tx)| tx.clone())
            .collect()
    }
}

#[async_trait]
impl GatewayApi for MockGateway {
    async fn tx_anchor(&self, _: &Gateway) -> Result<String> {
        Ok(b64::encode([5u8; 48]))
    }

    async fn price(&self, _: &Gateway, data_len: usize, _: &str) -> Result<String> {
        Ok((656 + data_len as u64).to_string())
    }

    async fn wallet_balance(&self, _: &Gateway, _: &str) -> Result<String> {
        Ok("2000000000000".to_string())
    }

    async fn post_transaction(&self, gateway: &Gateway, tx: &Transaction) -> Result<()> {
        self.posted
            .lock()
            .unwrap()
            .push((gateway.host.clone(), tx.clone()));
        if self.fail_hosts.contains(&gateway.host) {
            return Err(Error::Submission("gateway unavailable".to_string()));
        }
        Ok(())
    }

    async fn register_sequencer(&self, tx: &Transaction) -> Result<()> {
        self.registered.lock().unwrap().push(tx.clone());
        Ok(())
    }
}

pub struct MockResolver;

impl GatewayResolver for MockResolver {
    fn find_gateway(&self) -> Gateway {
        Gateway::new("https", "primary.test", 443)
    }

    fn fallback_gateway(&self) -> Gateway {
        Gateway::new("https", "fallback.test", 443)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<EventType>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<EventType> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn track(&self, event: EventType) {
        self.events.lock().unwrap().push(event);
    }
}

#[derive(Default)]
pub struct RecordingNavigation {
    opened: AtomicUsize,
}

impl RecordingNavigation {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl NavigationSink for RecordingNavigation {
    fn open_onboarding(&self) {
        self.opened.fetch_add(1, Ordering::SeqCst);
    }
}
