//! Error taxonomy for the wallet core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed payload or options, rejected before any network or crypto
    /// call runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No wallet is configured. Recoverable: the caller redirects the user
    /// to onboarding.
    #[error("no wallets added")]
    NoWallets,

    /// The active wallet is a hardware device and the requested operation is
    /// not supported over hardware.
    #[error("active wallet type: hardware. This does not support {0}")]
    UnsupportedWalletType(&'static str),

    /// Keystore decryption or integrity check failed. Recoverable: re-prompt.
    #[error("invalid password")]
    InvalidPassword,

    #[error("failed to build transaction: {0}")]
    TransactionBuild(String),

    #[error("failed to submit transaction: {0}")]
    Submission(String),

    #[error("unknown error occurred: {0}")]
    Unknown(String),
}

pub type Result<T> = std::result::Result<T, Error>;
