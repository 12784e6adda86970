use crate::utils::error::{CepError, ProviderFailure};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LOOKUP_KEY_LEN: usize = 8;

/// 8 個位元組的郵遞區號。只能透過 [`LookupKey::parse`] 建立。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey(String);

impl LookupKey {
    /// 長度以位元組計算，多位元組字元會讓 key 超過 8
    pub fn parse(raw: &str) -> Result<Self, CepError> {
        let len = raw.len();
        if len != LOOKUP_KEY_LEN {
            return Err(CepError::ValidationError {
                message: format!(
                    "postal code must have exactly {} characters, got {}",
                    LOOKUP_KEY_LEN, len
                ),
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized address. The wire names follow the ViaCEP layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressResult {
    #[serde(rename = "cep")]
    pub code: String,
    #[serde(rename = "logradouro")]
    pub street: String,
    #[serde(rename = "bairro")]
    pub neighborhood: String,
    #[serde(rename = "localidade")]
    pub city: String,
    #[serde(rename = "uf")]
    pub region: String,
}

impl AddressResult {
    /// Canonical wire field names, in output order.
    pub const FIELDS: [&'static str; 5] = ["cep", "logradouro", "bairro", "localidade", "uf"];

    pub fn field_mut(&mut self, wire_name: &str) -> Option<&mut String> {
        match wire_name {
            "cep" => Some(&mut self.code),
            "logradouro" => Some(&mut self.street),
            "bairro" => Some(&mut self.neighborhood),
            "localidade" => Some(&mut self.city),
            "uf" => Some(&mut self.region),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Success(AddressResult),
    Failure(ProviderFailure),
}
