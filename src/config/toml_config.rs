use crate::adapters::http_provider::ProviderPreset;
use crate::config::ServerConfig;
use crate::domain::ports::ProviderDefinition;
use crate::utils::error::{CepError, Result};
use crate::utils::validation::{validate_required_field, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub server: Option<ServerSection>,
    pub race: Option<RaceSection>,
    #[serde(default)]
    pub providers: Vec<ProviderSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    pub listen_addr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSection {
    pub timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub abort_losers: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSection {
    pub name: String,
    pub preset: Option<String>,
    pub endpoint: Option<String>,
    pub field_mapping: Option<HashMap<String, String>>,
    pub failure_marker: Option<String>,
    pub enabled: Option<bool>,
}

impl ProviderSection {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    /// 以 preset 為基礎，再套用檔案裡的覆寫欄位
    pub fn to_definition(&self) -> Result<ProviderDefinition> {
        let preset = match &self.preset {
            Some(preset_name) => Some(ProviderPreset::from_name(preset_name).ok_or_else(|| {
                CepError::InvalidConfigValueError {
                    field: format!("providers.{}.preset", self.name),
                    value: preset_name.clone(),
                    reason: format!(
                        "Unknown preset. Valid presets: {}",
                        ProviderPreset::ALL.map(|p| p.name()).join(", ")
                    ),
                }
            })?),
            // 沒寫 endpoint 時，名字剛好是 preset 就直接沿用
            None if self.endpoint.is_none() => ProviderPreset::from_name(&self.name),
            None => None,
        };

        let mut definition = match preset {
            Some(preset) => preset.definition(),
            None => {
                let endpoint = validate_required_field(
                    &format!("providers.{}.endpoint", self.name),
                    &self.endpoint,
                )?;
                ProviderDefinition {
                    name: self.name.clone(),
                    endpoint: endpoint.clone(),
                    field_mapping: HashMap::new(),
                    failure_marker: None,
                }
            }
        };

        definition.name = self.name.clone();
        if let Some(endpoint) = &self.endpoint {
            definition.endpoint = endpoint.clone();
        }
        if let Some(mapping) = &self.field_mapping {
            definition.field_mapping.extend(mapping.clone());
        }
        if let Some(marker) = &self.failure_marker {
            definition.failure_marker = Some(marker.clone());
        }

        Ok(definition)
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CepError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| CepError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${VIACEP_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| CepError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            // `{cep}` 不是環境變數，未設定的變數保持原樣
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 轉成執行期使用的 ServerConfig，未設定的欄位沿用預設值
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::default();

        if let Some(listen_addr) = self.server.as_ref().and_then(|s| s.listen_addr.as_ref()) {
            config.listen_addr =
                listen_addr
                    .parse::<SocketAddr>()
                    .map_err(|e| CepError::InvalidConfigValueError {
                        field: "server.listen_addr".to_string(),
                        value: listen_addr.clone(),
                        reason: e.to_string(),
                    })?;
        }

        if let Some(race) = &self.race {
            if let Some(timeout_ms) = race.timeout_ms {
                config.timeout = Duration::from_millis(timeout_ms);
            }
            if let Some(request_timeout_ms) = race.request_timeout_ms {
                config.request_timeout = Duration::from_millis(request_timeout_ms);
            }
            if let Some(abort_losers) = race.abort_losers {
                config.abort_losers = abort_losers;
            }
        }

        if !self.providers.is_empty() {
            config.providers = self
                .providers
                .iter()
                .filter(|p| p.is_enabled())
                .map(ProviderSection::to_definition)
                .collect::<Result<Vec<_>>>()?;
        }

        Ok(config)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.to_server_config()?.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[server]
listen_addr = "127.0.0.1:9000"

[race]
timeout_ms = 750
request_timeout_ms = 5000
abort_losers = true

[[providers]]
name = "viacep"

[[providers]]
name = "mirror"
endpoint = "https://cep.example.com/lookup/{cep}"
failure_marker = "error"

[providers.field_mapping]
zip = "cep"
road = "logradouro"
"#;

        let config = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_server_config()
            .unwrap();

        assert_eq!(config.listen_addr(), "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.race_timeout(), Duration::from_millis(750));
        assert_eq!(config.request_timeout(), Duration::from_millis(5000));
        assert!(config.abort_losers());

        let providers = config.providers();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0], ProviderPreset::ViaCep.definition());
        assert_eq!(providers[1].endpoint, "https://cep.example.com/lookup/{cep}");
        assert_eq!(providers[1].field_mapping.get("road").unwrap(), "logradouro");
        assert_eq!(providers[1].failure_marker.as_deref(), Some("error"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap().to_server_config().unwrap();

        assert_eq!(config.listen_addr(), "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.race_timeout(), Duration::from_secs(1));
        assert!(!config.abort_losers());
        let names: Vec<String> = config.providers().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["viacep", "brasilapi"]);
    }

    #[test]
    fn test_preset_with_endpoint_override() {
        let toml_content = r#"
[[providers]]
name = "brasilapi-staging"
preset = "brasilapi"
endpoint = "https://staging.example.com/cep/{cep}"
"#;

        let config = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_server_config()
            .unwrap();
        let provider = &config.providers()[0];

        assert_eq!(provider.name, "brasilapi-staging");
        assert_eq!(provider.endpoint, "https://staging.example.com/cep/{cep}");
        assert_eq!(provider.field_mapping.get("state").unwrap(), "uf");
    }

    #[test]
    fn test_disabled_providers_are_skipped() {
        let toml_content = r#"
[[providers]]
name = "viacep"
enabled = false

[[providers]]
name = "brasilapi"
"#;

        let config = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_server_config()
            .unwrap();
        assert_eq!(config.providers().len(), 1);
        assert_eq!(config.providers()[0].name, "brasilapi");
    }

    #[test]
    fn test_unknown_provider_without_endpoint_is_rejected() {
        let toml_content = r#"
[[providers]]
name = "correios"
"#;

        let err = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_server_config()
            .unwrap_err();
        assert!(matches!(err, CepError::MissingConfigError { field } if field == "providers.correios.endpoint"));
    }

    #[test]
    fn test_unknown_preset_is_rejected() {
        let toml_content = r#"
[[providers]]
name = "x"
preset = "correios"
"#;

        let err = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_server_config()
            .unwrap_err();
        assert!(matches!(err, CepError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_invalid_listen_addr_is_rejected() {
        let toml_content = r#"
[server]
listen_addr = "not-an-address"
"#;

        let err = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_server_config()
            .unwrap_err();
        assert!(matches!(err, CepError::InvalidConfigValueError { field, .. } if field == "server.listen_addr"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CEP_RACE_TEST_MIRROR", "https://mirror.example.com");

        let toml_content = r#"
[[providers]]
name = "mirror"
endpoint = "${CEP_RACE_TEST_MIRROR}/cep/{cep}"
"#;

        let config = TomlConfig::from_toml_str(toml_content)
            .unwrap()
            .to_server_config()
            .unwrap();
        assert_eq!(
            config.providers()[0].endpoint,
            "https://mirror.example.com/cep/{cep}"
        );

        std::env::remove_var("CEP_RACE_TEST_MIRROR");
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[[providers]]
name = "mirror"
endpoint = "invalid-url/{cep}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let err = TomlConfig::from_toml_str("[race\ntimeout_ms = ").unwrap_err();
        assert!(matches!(err, CepError::ConfigValidationError { field, .. } if field == "toml_parsing"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[race]
timeout_ms = 300
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.race.unwrap().timeout_ms, Some(300));
    }
}
