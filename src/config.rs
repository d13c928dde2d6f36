use std::{fs, path::PathBuf, time::Duration};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::gateway::Gateway;

/// Client identification tags attached to every transfer.
pub const CLIENT_NAME: &str = "Arclight";
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Process id of the AO native token. Balances for this entry go through the
/// gateway wallet-balance lookup instead of a process dry-run.
pub const AO_NATIVE_TOKEN: &str = "0syT13r0s0tgPmIed95bJnuSqaD29HQNN8D3ElLSrsc";

/// Hard ceiling on a single gateway broadcast attempt.
pub const SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: Gateway,
    pub fallback_gateway: Gateway,
    /// Warp sequencer registration endpoint for token interactions.
    pub warp_sequencer_url: String,
    /// AO compute unit used for process balance dry-runs.
    pub ao_cu_url: String,
}

impl Config {
    pub fn new() -> Self {
        Self::load().unwrap_or_else(|_| Self::default())
    }

    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")?;
        let mut path = PathBuf::from(home);
        path.push(".arclight");
        path.push("config.json");
        Ok(path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: Gateway::new("https", "arweave.net", 443),
            fallback_gateway: Gateway::new("https", "ar-io.net", 443),
            warp_sequencer_url: "https://gateway.warp.cc/gateway/sequencer/register".to_string(),
            ao_cu_url: "https://cu.ao-testnet.xyz".to_string(),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::new);
