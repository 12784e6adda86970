pub mod race;

pub use crate::domain::model::{AddressResult, LookupKey, ProviderOutcome};
pub use crate::domain::ports::{AddressProvider, ConfigProvider, ProviderDefinition};
pub use crate::utils::error::Result;
pub use race::{resolve, RaceCoordinator, SharedProvider};
