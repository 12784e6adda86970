use crate::core::SharedProvider;
use crate::domain::model::{AddressResult, LookupKey, ProviderOutcome};
use crate::domain::ports::{AddressProvider, ConfigProvider, ProviderDefinition};
use crate::utils::error::{self, ProviderFailure};
use crate::utils::validation::CEP_PLACEHOLDER;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

pub const VIACEP_ENDPOINT: &str = "http://viacep.com.br/ws/{cep}/json/";
pub const BRASILAPI_ENDPOINT: &str = "https://brasilapi.com.br/api/cep/v1/{cep}";

/// key 只能佔一個 path segment：`/` `?` `#` `%` 等都要編碼
const KEY_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 內建的上游服務設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderPreset {
    ViaCep,
    BrasilApi,
}

impl ProviderPreset {
    pub const ALL: [ProviderPreset; 2] = [ProviderPreset::ViaCep, ProviderPreset::BrasilApi];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "viacep" => Some(ProviderPreset::ViaCep),
            "brasilapi" => Some(ProviderPreset::BrasilApi),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProviderPreset::ViaCep => "viacep",
            ProviderPreset::BrasilApi => "brasilapi",
        }
    }

    pub fn definition(&self) -> ProviderDefinition {
        match self {
            // ViaCEP 已經是輸出格式，不需要映射；查無資料時回 200 + {"erro": true}
            ProviderPreset::ViaCep => ProviderDefinition {
                name: self.name().to_string(),
                endpoint: VIACEP_ENDPOINT.to_string(),
                field_mapping: HashMap::new(),
                failure_marker: Some("erro".to_string()),
            },
            ProviderPreset::BrasilApi => ProviderDefinition {
                name: self.name().to_string(),
                endpoint: BRASILAPI_ENDPOINT.to_string(),
                field_mapping: [
                    ("street", "logradouro"),
                    ("neighborhood", "bairro"),
                    ("city", "localidade"),
                    ("state", "uf"),
                ]
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
                failure_marker: None,
            },
        }
    }
}

pub struct HttpProvider {
    client: Client,
    definition: ProviderDefinition,
}

impl HttpProvider {
    pub fn new(client: Client, definition: ProviderDefinition) -> Self {
        Self { client, definition }
    }

    pub fn endpoint_for(&self, key: &LookupKey) -> String {
        let segment = utf8_percent_encode(key.as_str(), KEY_SEGMENT_ENCODE_SET).to_string();
        self.definition.endpoint.replace(CEP_PLACEHOLDER, &segment)
    }

    async fn try_fetch(&self, key: &LookupKey) -> Result<AddressResult, ProviderFailure> {
        let url = self.endpoint_for(key);
        tracing::debug!("Making request to {}: {}", self.definition.name, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderFailure::Transport(e.to_string()))?;

        let status = response.status();
        tracing::debug!("{} response status: {}", self.definition.name, status);
        if !status.is_success() {
            return Err(ProviderFailure::Status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ProviderFailure::Decode(e.to_string()))?;

        self.decode(payload)
    }

    /// 把 provider 的 JSON 轉成 AddressResult，只做欄位改名
    pub fn decode(&self, payload: Value) -> Result<AddressResult, ProviderFailure> {
        let Value::Object(obj) = payload else {
            return Err(ProviderFailure::Decode(
                "expected a JSON object".to_string(),
            ));
        };

        if let Some(marker) = &self.definition.failure_marker {
            if obj.get(marker).is_some_and(is_truthy) {
                return Err(ProviderFailure::Rejected(marker.clone()));
            }
        }

        let mut address = AddressResult::default();
        for (original_key, value) in obj {
            let mapped_key = self
                .definition
                .field_mapping
                .get(&original_key)
                .map(String::as_str)
                .unwrap_or(original_key.as_str());

            let Some(slot) = address.field_mut(mapped_key) else {
                continue;
            };

            match value {
                Value::String(s) => *slot = s,
                Value::Null => {}
                other => {
                    return Err(ProviderFailure::Decode(format!(
                        "field '{}' is not a string: {}",
                        original_key, other
                    )))
                }
            }
        }

        Ok(address)
    }
}

/// 依照配置建立 HTTP providers，共用同一個 reqwest client
pub fn build_providers<C: ConfigProvider>(config: &C) -> error::Result<Vec<SharedProvider>> {
    let client = Client::builder()
        .timeout(config.request_timeout())
        .build()?;

    Ok(config
        .providers()
        .into_iter()
        .map(|definition| Arc::new(HttpProvider::new(client.clone(), definition)) as SharedProvider)
        .collect())
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[async_trait]
impl AddressProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.definition.name
    }

    async fn fetch(&self, key: &LookupKey) -> ProviderOutcome {
        match self.try_fetch(key).await {
            Ok(address) => {
                tracing::info!(provider = %self.definition.name, "Response {}: {:?}", self.definition.name, address);
                ProviderOutcome::Success(address)
            }
            Err(cause) => {
                tracing::warn!(provider = %self.definition.name, "{} failed for {}: {}", self.definition.name, key, cause);
                ProviderOutcome::Failure(cause)
            }
        }
    }
}
