use crate::domain::model::{AddressResult, LookupKey, ProviderOutcome};
use crate::domain::ports::AddressProvider;
use crate::utils::error::{ProviderFailure, RaceError};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub type SharedProvider = Arc<dyn AddressProvider>;

/// 同時向所有 provider 發出查詢，回傳第一個成功的結果。
///
/// 落後的 task 會被 detach：結果直接丟棄，不會再被 await。
pub async fn resolve(
    key: &LookupKey,
    providers: &[SharedProvider],
    deadline: Duration,
) -> std::result::Result<AddressResult, RaceError> {
    race(key, providers, deadline, false).await
}

async fn race(
    key: &LookupKey,
    providers: &[SharedProvider],
    deadline: Duration,
    abort_losers: bool,
) -> std::result::Result<AddressResult, RaceError> {
    if providers.is_empty() {
        tracing::warn!("No providers registered, nothing to race");
        return Err(RaceError::AllFailed { attempted: 0 });
    }

    let started = Instant::now();
    let mut abort_handles = Vec::with_capacity(providers.len());
    let mut pending = FuturesUnordered::new();

    for provider in providers {
        let provider = Arc::clone(provider);
        let name = provider.name().to_string();
        let task_key = key.clone();
        let handle = tokio::spawn(async move { provider.fetch(&task_key).await });
        abort_handles.push(handle.abort_handle());

        pending.push(async move {
            // panic 或被取消的 task 也算一次失敗
            let outcome = handle.await.unwrap_or_else(|e| {
                let cause = if e.is_panic() {
                    ProviderFailure::Panicked
                } else {
                    ProviderFailure::Cancelled
                };
                ProviderOutcome::Failure(cause)
            });
            (name, outcome)
        });
    }

    let attempted = pending.len();
    tracing::debug!("Racing {} providers for {} (deadline {:?})", attempted, key, deadline);

    let first_success = async {
        let mut failures = 0usize;
        while let Some((name, outcome)) = pending.next().await {
            match outcome {
                ProviderOutcome::Success(address) => {
                    tracing::info!(
                        provider = %name,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "{} answered first for {}",
                        name,
                        key
                    );
                    return Some(address);
                }
                ProviderOutcome::Failure(cause) => {
                    failures += 1;
                    tracing::debug!(
                        provider = %name,
                        "{} failed for {} ({}/{}): {}",
                        name,
                        key,
                        failures,
                        attempted,
                        cause
                    );
                }
            }
        }
        None
    };

    let result = match tokio::time::timeout(deadline, first_success).await {
        Ok(Some(address)) => Ok(address),
        Ok(None) => {
            tracing::warn!("All {} providers failed for {}", attempted, key);
            Err(RaceError::AllFailed { attempted })
        }
        Err(_) => {
            tracing::warn!("Request timeout for {} after {:?}", key, deadline);
            Err(RaceError::Timeout(deadline))
        }
    };

    if abort_losers {
        // 已完成的 task 呼叫 abort 不會有任何效果
        for handle in abort_handles {
            handle.abort();
        }
    }

    result
}

/// Owns the provider set and race settings for the lifetime of the server.
pub struct RaceCoordinator {
    providers: Vec<SharedProvider>,
    deadline: Duration,
    abort_losers: bool,
}

impl RaceCoordinator {
    pub fn new(providers: Vec<SharedProvider>, deadline: Duration) -> Self {
        Self {
            providers,
            deadline,
            abort_losers: false,
        }
    }

    pub fn with_abort_losers(mut self, abort_losers: bool) -> Self {
        self.abort_losers = abort_losers;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub async fn resolve(&self, key: &LookupKey) -> std::result::Result<AddressResult, RaceError> {
        race(key, &self.providers, self.deadline, self.abort_losers).await
    }
}
