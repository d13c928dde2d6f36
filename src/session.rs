//! Session-scoped pending transfer state.
//!
//! When the user initiates a send, the reviewed transfer is staged here and
//! consumed exactly once by the confirmation step. Whatever happens during
//! submission, the descriptor is gone afterwards; a second confirmation has
//! nothing to act on.

use std::sync::Mutex;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub token_id: String,
    /// Base units: winston for native, contract units for tokens.
    pub quantity: u64,
    pub recipient: String,
    pub message: Option<String>,
    /// Quoted network fee in winston.
    pub network_fee: String,
    pub estimated_fiat: Option<String>,
    pub estimated_network_fee_fiat: Option<String>,
}

pub struct TempStorage {
    slot: Mutex<Option<(PendingTransfer, DateTime<Utc>)>>,
    ttl: TimeDelta,
}

impl TempStorage {
    pub fn new(ttl: Option<TimeDelta>) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl: ttl.unwrap_or_else(|| TimeDelta::minutes(10)),
        }
    }

    pub fn stage(&self, transfer: PendingTransfer) {
        let mut slot = self.slot.lock().unwrap();
        *slot = Some((transfer, Utc::now()));
    }

    /// Takes the staged transfer, consuming it. Expired descriptors are
    /// discarded as if never staged.
    pub fn take(&self) -> Option<PendingTransfer> {
        let mut slot = self.slot.lock().unwrap();
        let (transfer, staged_at) = slot.take()?;
        if staged_at + self.ttl < Utc::now() {
            return None;
        }
        Some(transfer)
    }
}

impl Default for TempStorage {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> PendingTransfer {
        PendingTransfer {
            token_id: "AR".to_string(),
            quantity: 5,
            recipient: "abc".to_string(),
            message: None,
            network_fee: "656".to_string(),
            estimated_fiat: Some("0.10".to_string()),
            estimated_network_fee_fiat: None,
        }
    }

    #[test]
    fn test_take_consumes_exactly_once() {
        let storage = TempStorage::default();
        assert!(storage.take().is_none());

        storage.stage(transfer());
        assert_eq!(storage.take(), Some(transfer()));
        assert!(storage.take().is_none());
    }

    #[test]
    fn test_restaging_replaces() {
        let storage = TempStorage::default();
        storage.stage(transfer());
        let mut other = transfer();
        other.quantity = 7;
        storage.stage(other.clone());
        assert_eq!(storage.take(), Some(other));
    }

    #[test]
    fn test_expired_transfer_is_discarded() {
        let storage = TempStorage::new(Some(TimeDelta::zero()));
        storage.stage(transfer());
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(storage.take().is_none());
    }
}
