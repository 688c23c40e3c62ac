use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("missing required env var: {0}")]
    MissingEnv(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub withdrawal: WithdrawalConfig,
    #[serde(default)]
    pub unkill: UnkillConfig,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub answers: AnswersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RpcConfig {
    /// Primary WebSocket RPC URL - loaded from env CHAINWATCH_WS_URL
    #[serde(default)]
    pub ws_url: String,
    /// Fallback WebSocket URLs rotated through on connection failure
    #[serde(default)]
    pub fallback_ws_urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawalConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Pool token addresses tracked from startup (hex strings)
    #[serde(default)]
    pub tracked_tokens: Vec<String>,
    /// Redemption size as a percentage of total supply above which to alert
    #[serde(default = "default_threshold_pct")]
    pub threshold_pct: u64,
    /// Comptroller address watched for MarketListed events
    #[serde(default = "default_comptroller")]
    pub comptroller: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnkillConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_unkill_alert_id")]
    pub alert_id: String,
    /// Pool address the unkill call is expected to target
    #[serde(default)]
    pub pool: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GasConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswersConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Reality module whose oracle() view names the address to watch.
    /// Empty disables the agent.
    #[serde(default)]
    pub reality_module: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_true() -> bool {
    true
}
fn default_threshold_pct() -> u64 {
    25
}
fn default_comptroller() -> String {
    // Benqi comptroller on Avalanche C-Chain
    "0x486Af39519B4Dc9a7fCcd318217352830E8AD9b4".to_string()
}
fn default_unkill_alert_id() -> String {
    "CURVE-UNKILL-1".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WithdrawalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tracked_tokens: Vec::new(),
            threshold_pct: default_threshold_pct(),
            comptroller: default_comptroller(),
        }
    }
}

impl Default for UnkillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            alert_id: default_unkill_alert_id(),
            pool: String::new(),
        }
    }
}

impl Default for GasConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for AnswersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reality_module: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load from a TOML file, then layer env vars on top.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    /// Env-only config: defaults everywhere, WS URL required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();
        config.apply_env();
        if config.rpc.ws_url.is_empty() {
            return Err(ConfigError::MissingEnv("CHAINWATCH_WS_URL".to_string()));
        }
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("CHAINWATCH_WS_URL") {
            self.rpc.ws_url = url;
        }
        if let Ok(module) = std::env::var("CHAINWATCH_REALITY_MODULE") {
            self.answers.reality_module = module;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_config() {
        let raw = r#"
            [rpc]
            ws_url = "wss://example.invalid/ws"

            [withdrawal]
            tracked_tokens = ["0x5C0401e81Bc07Ca70fAD469b451682c0d747Ef1c"]
            threshold_pct = 30

            [answers]
            reality_module = "0x0eBaC21F7f6A6599B5fa5f57Baaa974ADFEC4613"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.rpc.ws_url, "wss://example.invalid/ws");
        assert_eq!(config.withdrawal.threshold_pct, 30);
        assert_eq!(config.withdrawal.tracked_tokens.len(), 1);
        assert!(config.withdrawal.enabled);
        assert!(config.gas.enabled);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn empty_config_gets_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.withdrawal.threshold_pct, 25);
        assert_eq!(config.unkill.alert_id, "CURVE-UNKILL-1");
        assert!(config.answers.reality_module.is_empty());
    }
}
