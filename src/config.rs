//! Configuration for the sponsor relay server.
//!
//! CLI args (`clap`) layered over a JSON config file, with serde defaults
//! falling back to environment variables, following
//! `facilitator/src/config.rs`'s layering in the teacher.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use serde_with::{VecSkipError, serde_as};

use crate::apikeys::ApiKeyProvision;

#[derive(Parser, Debug)]
#[command(name = "sponsor-relay")]
#[command(about = "Sponsored-transaction relay HTTP server")]
struct CliArgs {
    /// Path to the JSON configuration file.
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainNetwork {
    Mainnet,
    Testnet,
}

impl ChainNetwork {
    pub fn default_base_url(self) -> &'static str {
        match self {
            ChainNetwork::Mainnet => "https://api.hiro.so",
            ChainNetwork::Testnet => "https://api.testnet.hiro.so",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", untagged)]
pub enum SponsorKeyMaterial {
    Mnemonic { mnemonic: String, account_count: usize },
    RawKey { raw_key: String },
}

fn config_defaults_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8787)
}

fn config_defaults_host() -> IpAddr {
    std::env::var("HOST")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED))
}

fn config_defaults_network() -> ChainNetwork {
    match std::env::var("CHAIN_NETWORK").as_deref() {
        Ok("mainnet") => ChainNetwork::Mainnet,
        _ => ChainNetwork::Testnet,
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "config_defaults_port")]
    pub port: u16,
    #[serde(default = "config_defaults_host")]
    pub host: IpAddr,
    #[serde(default = "config_defaults_network")]
    pub network: ChainNetwork,
    pub sponsor_key: SponsorKeyMaterial,
    #[serde(default)]
    pub chain_api_key: Option<String>,
    #[serde(default)]
    pub chain_base_url_override: Option<String>,
    #[serde(default)]
    pub facilitator_url: Option<String>,
    /// Provisioned API keys, following the teacher's `proto` module pattern
    /// of deserializing arrays leniently (`VecSkipError`) so one malformed
    /// entry doesn't reject the whole config file.
    #[serde(default)]
    #[serde_as(as = "VecSkipError<_>")]
    pub api_keys: Vec<ApiKeyProvision>,
}

impl Config {
    pub fn chain_base_url(&self) -> String {
        self.chain_base_url_override
            .clone()
            .unwrap_or_else(|| self.network.default_base_url().to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        let config_path = Path::new(&cli_args.config)
            .canonicalize()
            .map_err(|e| ConfigError::FileRead(cli_args.config, e))?;
        Self::load_from_path(config_path)
    }

    fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
