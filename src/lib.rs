//! Arweave wallet core.
//!
//! The pipeline behind the send button: resolve and unlock the active
//! wallet, construct a protocol-correct transfer transaction, sign it with
//! RSA-PSS and broadcast it with timeout and fallback-gateway semantics.
//! The UI shell that drives this crate is a separate concern.

pub mod analytics;
pub mod config;
pub mod encryptor;
pub mod error;
pub mod gateway;
pub mod keystore;
pub mod session;
pub mod signer;
pub mod storage;
pub mod submit;
pub mod tokens;
pub mod tx;
pub mod utils;
pub mod wallet;
pub mod wallet_service;
