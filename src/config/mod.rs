pub mod toml_config;

use crate::adapters::http_provider::ProviderPreset;
use crate::core::{ConfigProvider, ProviderDefinition};
use crate::domain::model::AddressResult;
use crate::utils::error::{CepError, Result};
use crate::utils::validation::{
    validate_endpoint_template, validate_non_empty_string, validate_positive_number,
    validate_unique_names, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "cep-race")]
#[command(about = "Resolve Brazilian postal codes by racing upstream lookup services")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub listen_addr: Option<SocketAddr>,

    /// Race deadline in milliseconds (overrides the config file)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Per-call timeout of the upstream HTTP client in milliseconds
    #[arg(long)]
    pub request_timeout_ms: Option<u64>,

    /// Abort the losing provider calls once a race is decided
    #[arg(long)]
    pub abort_losers: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

/// 執行期的最終配置：預設值 < TOML 檔 < 命令列
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub timeout: Duration,
    pub request_timeout: Duration,
    pub abort_losers: bool,
    pub providers: Vec<ProviderDefinition>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            abort_losers: false,
            providers: ProviderPreset::ALL.iter().map(|p| p.definition()).collect(),
        }
    }
}

impl ServerConfig {
    pub fn from_cli(cli: &CliConfig) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                tracing::info!("📁 Loading configuration from: {}", path);
                TomlConfig::from_file(path)?.to_server_config()?
            }
            None => Self::default(),
        };

        config.apply_overrides(cli);
        Ok(config)
    }

    pub fn apply_overrides(&mut self, cli: &CliConfig) {
        if let Some(listen_addr) = cli.listen_addr {
            self.listen_addr = listen_addr;
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            self.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(request_timeout_ms) = cli.request_timeout_ms {
            self.request_timeout = Duration::from_millis(request_timeout_ms);
        }
        if cli.abort_losers {
            self.abort_losers = true;
        }
    }
}

impl ConfigProvider for ServerConfig {
    fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    fn race_timeout(&self) -> Duration {
        self.timeout
    }

    fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    fn abort_losers(&self) -> bool {
        self.abort_losers
    }

    fn providers(&self) -> Vec<ProviderDefinition> {
        self.providers.clone()
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validate_positive_number("race.timeout_ms", self.timeout.as_millis() as u64, 1)?;
        validate_positive_number(
            "race.request_timeout_ms",
            self.request_timeout.as_millis() as u64,
            1,
        )?;

        if self.providers.is_empty() {
            return Err(CepError::ConfigValidationError {
                field: "providers".to_string(),
                message: "At least one provider must be enabled".to_string(),
            });
        }

        validate_unique_names("providers.name", self.providers.iter().map(|p| p.name.as_str()))?;

        for provider in &self.providers {
            validate_non_empty_string("providers.name", &provider.name)?;
            validate_endpoint_template(
                &format!("providers.{}.endpoint", provider.name),
                &provider.endpoint,
            )?;

            for (from, to) in &provider.field_mapping {
                if !AddressResult::FIELDS.contains(&to.as_str()) {
                    return Err(CepError::InvalidConfigValueError {
                        field: format!("providers.{}.field_mapping.{}", provider.name, from),
                        value: to.clone(),
                        reason: format!(
                            "Unknown target field. Valid fields: {}",
                            AddressResult::FIELDS.join(", ")
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}
