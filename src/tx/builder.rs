//! Transfer construction.
//!
//! Two kinds of transfer come out of the send flow. A native transfer moves
//! winston directly and may carry a plaintext message as its data payload. A
//! token transfer is a zero-quantity transaction whose tags carry a
//! SmartWeave `transfer` instruction targeting the token's contract.

use percent_encoding::percent_decode_str;
use serde_json::json;

use crate::{
    config,
    error::{Error, Result},
    gateway::{Gateway, GatewayApi},
    tx::Transaction,
    utils::b64,
};

/// Token id that denotes the native asset.
pub const NATIVE_TOKEN_ID: &str = "AR";

#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub token_id: String,
    /// Base units: winston for native, contract units for tokens.
    pub quantity: u64,
    pub recipient: String,
    /// Percent-encoded plaintext attached to the transfer.
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Native,
    Token,
}

impl TransferKind {
    pub fn of(token_id: &str) -> Self {
        if token_id == NATIVE_TOKEN_ID {
            Self::Native
        } else {
            Self::Token
        }
    }
}

/// Anchor and reward quote fetched from the gateway before building.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub anchor: String,
    pub reward: String,
}

pub trait BuildTransfer {
    fn build(&self, req: &TransferRequest, ctx: &BuildContext) -> Result<Transaction>;
}

pub enum TransferBuilderKind {
    Native(NativeTransferBuilder),
    Token(TokenTransferBuilder),
}

impl BuildTransfer for TransferBuilderKind {
    fn build(&self, req: &TransferRequest, ctx: &BuildContext) -> Result<Transaction> {
        match self {
            TransferBuilderKind::Native(b) => b.build(req, ctx),
            TransferBuilderKind::Token(b) => b.build(req, ctx),
        }
    }
}

pub struct TransferBuilderFactory;

impl TransferBuilderFactory {
    pub fn create_builder(&self, token_id: &str) -> TransferBuilderKind {
        match TransferKind::of(token_id) {
            TransferKind::Native => TransferBuilderKind::Native(NativeTransferBuilder),
            TransferKind::Token => TransferBuilderKind::Token(TokenTransferBuilder),
        }
    }
}

pub struct NativeTransferBuilder;

impl BuildTransfer for NativeTransferBuilder {
    fn build(&self, req: &TransferRequest, ctx: &BuildContext) -> Result<Transaction> {
        let data = decode_message(req.message.as_deref())?;
        let mut tx = Transaction::new(
            &req.recipient,
            &req.quantity.to_string(),
            data,
            &ctx.anchor,
            &ctx.reward,
        );
        add_transfer_tags(&mut tx, req.message.is_some());
        Ok(tx)
    }
}

pub struct TokenTransferBuilder;

impl BuildTransfer for TokenTransferBuilder {
    fn build(&self, req: &TransferRequest, ctx: &BuildContext) -> Result<Transaction> {
        // The value moves inside the contract, not on the base layer.
        let mut tx = Transaction::new(&req.recipient, "0", None, &ctx.anchor, &ctx.reward);
        tx.add_tag("App-Name", "SmartWeaveAction");
        tx.add_tag("App-Version", "0.3.0");
        tx.add_tag("Contract", &req.token_id);
        let input = json!({
            "function": "transfer",
            "target": req.recipient,
            "qty": req.quantity,
        });
        tx.add_tag("Input", &input.to_string());
        add_transfer_tags(&mut tx, req.message.is_some());
        Ok(tx)
    }
}

fn add_transfer_tags(tx: &mut Transaction, has_message: bool) {
    if has_message {
        tx.add_tag("Content-Type", "text/plain");
    }
    tx.add_tag("Type", "Transfer");
    tx.add_tag("Client", config::CLIENT_NAME);
    tx.add_tag("Client-Version", config::CLIENT_VERSION);
}

fn decode_message(message: Option<&str>) -> Result<Option<Vec<u8>>> {
    match message {
        None => Ok(None),
        Some(encoded) => {
            let decoded = percent_decode_str(encoded)
                .decode_utf8()
                .map_err(|e| Error::TransactionBuild(format!("malformed message: {}", e)))?;
            Ok(Some(decoded.as_bytes().to_vec()))
        }
    }
}

/// Builds an unsigned transfer, fetching the anchor and reward quote from
/// the gateway first. Any gateway or validation failure aborts the build
/// with no partial transaction escaping to the submission stage.
pub struct TxFactory<'a, G: GatewayApi> {
    api: &'a G,
}

impl<'a, G: GatewayApi> TxFactory<'a, G> {
    pub fn new(api: &'a G) -> Self {
        Self { api }
    }

    pub async fn build_transfer(
        &self,
        gateway: &Gateway,
        req: &TransferRequest,
    ) -> Result<Transaction> {
        validate_target(&req.recipient)?;

        // The reward quote depends on the payload size for native transfers.
        let data_len = match TransferKind::of(&req.token_id) {
            TransferKind::Native => decode_message(req.message.as_deref())?
                .map(|d| d.len())
                .unwrap_or(0),
            TransferKind::Token => 0,
        };

        let anchor = self
            .api
            .tx_anchor(gateway)
            .await
            .map_err(|e| Error::TransactionBuild(e.to_string()))?;
        let reward = self
            .api
            .price(gateway, data_len, &req.recipient)
            .await
            .map_err(|e| Error::TransactionBuild(e.to_string()))?;

        let builder = TransferBuilderFactory.create_builder(&req.token_id);
        builder.build(req, &BuildContext { anchor, reward })
    }
}

fn validate_target(target: &str) -> Result<()> {
    let raw = b64::decode(target)
        .map_err(|e| Error::TransactionBuild(format!("malformed target address: {}", e)))?;
    if raw.len() != 32 {
        return Err(Error::TransactionBuild(format!(
            "malformed target address: expected 32 bytes, got {}",
            raw.len()
        )));
    }
    Ok(())
}
