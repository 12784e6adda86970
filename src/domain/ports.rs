use crate::domain::model::{LookupKey, ProviderOutcome};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

/// 一個上游查詢服務。`fetch` 不得 panic 或回傳錯誤，所有失敗都要變成 `ProviderOutcome::Failure`。
#[async_trait]
pub trait AddressProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self, key: &LookupKey) -> ProviderOutcome;
}

/// Resolved definition of one provider, independent of where it was configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDefinition {
    pub name: String,
    pub endpoint: String,
    /// provider field -> wire field (`cep`, `logradouro`, ...)
    pub field_mapping: HashMap<String, String>,
    pub failure_marker: Option<String>,
}

pub trait ConfigProvider: Send + Sync {
    fn listen_addr(&self) -> SocketAddr;
    fn race_timeout(&self) -> Duration;
    fn request_timeout(&self) -> Duration;
    fn abort_losers(&self) -> bool;
    fn providers(&self) -> Vec<ProviderDefinition>;
}
