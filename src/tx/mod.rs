//! Arweave transaction wire format.
//!
//! Format-2 transactions: every byte field travels base64url encoded, the
//! quantity and reward are decimal winston strings, and tags are an ordered
//! sequence of name/value pairs. Tag order is part of the protocol (contract
//! interactions are decoded positionally by consumers), so tags live in a
//! `Vec` and are never reordered.

pub mod builder;
pub mod deep_hash;
pub mod merkle;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    error::{Error, Result},
    tx::deep_hash::{DeepHashItem, deep_hash},
    utils::b64,
};

const WINSTON_PER_AR: u128 = 1_000_000_000_000;

/// A name/value metadata pair, base64url encoded on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn from_utf8(name: &str, value: &str) -> Self {
        Self {
            name: b64::encode(name),
            value: b64::encode(value),
        }
    }

    pub fn decoded(&self) -> Result<(String, String)> {
        let name = decode_utf8(&self.name)?;
        let value = decode_utf8(&self.value)?;
        Ok((name, value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub format: u8,
    pub id: String,
    pub last_tx: String,
    pub owner: String,
    pub tags: Vec<Tag>,
    pub target: String,
    pub quantity: String,
    pub data: String,
    pub data_size: String,
    pub data_root: String,
    pub reward: String,
    pub signature: String,
}

impl Transaction {
    pub fn new(
        target: &str,
        quantity: &str,
        data: Option<Vec<u8>>,
        anchor: &str,
        reward: &str,
    ) -> Self {
        let data = data.unwrap_or_default();
        let data_root = merkle::compute_root(&data)
            .map(b64::encode)
            .unwrap_or_default();
        Self {
            format: 2,
            id: String::new(),
            last_tx: anchor.to_string(),
            owner: String::new(),
            tags: Vec::new(),
            target: target.to_string(),
            quantity: quantity.to_string(),
            data_size: data.len().to_string(),
            data: b64::encode(&data),
            data_root,
            reward: reward.to_string(),
            signature: String::new(),
        }
    }

    /// Appends a tag, preserving insertion order.
    pub fn add_tag(&mut self, name: &str, value: &str) {
        self.tags.push(Tag::from_utf8(name, value));
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    /// Sets the owner modulus. Once signed, the owner is immutable;
    /// changing it requires rebuilding the transaction.
    pub fn set_owner(&mut self, owner: &str) -> Result<()> {
        if self.is_signed() {
            return Err(Error::InvalidInput(
                "cannot change owner of a signed transaction".to_string(),
            ));
        }
        self.owner = owner.to_string();
        Ok(())
    }

    /// The deep-hash over the format-2 signature element list. This is what
    /// gets signed; any mutation of the listed fields invalidates it.
    pub fn signature_data(&self) -> Result<[u8; 48]> {
        let tags = self
            .tags
            .iter()
            .map(|tag| {
                Ok(DeepHashItem::list(vec![
                    DeepHashItem::blob(decode_field(&tag.name, "tag name")?),
                    DeepHashItem::blob(decode_field(&tag.value, "tag value")?),
                ]))
            })
            .collect::<Result<Vec<_>>>()?;

        let elements = DeepHashItem::list(vec![
            DeepHashItem::blob(self.format.to_string().into_bytes()),
            DeepHashItem::blob(decode_field(&self.owner, "owner")?),
            DeepHashItem::blob(decode_field(&self.target, "target")?),
            DeepHashItem::blob(self.quantity.clone().into_bytes()),
            DeepHashItem::blob(self.reward.clone().into_bytes()),
            DeepHashItem::blob(decode_field(&self.last_tx, "last_tx")?),
            DeepHashItem::list(tags),
            DeepHashItem::blob(self.data_size.clone().into_bytes()),
            DeepHashItem::blob(decode_field(&self.data_root, "data_root")?),
        ]);

        Ok(deep_hash(&elements))
    }

    /// Attaches the signature and derives the id from it. Re-signing a
    /// signed transaction is rejected; rebuild instead.
    pub fn set_signature(&mut self, signature: &[u8]) -> Result<()> {
        if self.is_signed() {
            return Err(Error::InvalidInput(
                "transaction is already signed".to_string(),
            ));
        }
        self.signature = b64::encode(signature);
        self.id = b64::encode(Sha256::digest(signature));
        Ok(())
    }

    pub fn data_len(&self) -> usize {
        self.data_size.parse().unwrap_or(0)
    }

    pub fn decoded_tags(&self) -> Result<Vec<(String, String)>> {
        self.tags.iter().map(Tag::decoded).collect()
    }
}

/// Formats a winston amount as an AR decimal string.
pub fn winston_to_ar(winston: &str) -> Option<String> {
    let value: u128 = winston.parse().ok()?;
    let whole = value / WINSTON_PER_AR;
    let frac = value % WINSTON_PER_AR;
    if frac == 0 {
        return Some(whole.to_string());
    }
    let frac = format!("{:012}", frac);
    Some(format!("{}.{}", whole, frac.trim_end_matches('0')))
}

fn decode_field(encoded: &str, name: &str) -> Result<Vec<u8>> {
    b64::decode(encoded)
        .map_err(|e| Error::InvalidInput(format!("invalid base64url in {}: {}", name, e)))
}

fn decode_utf8(encoded: &str) -> Result<String> {
    let bytes = decode_field(encoded, "tag")?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidInput(format!("tag is not utf-8: {}", e)))
}
