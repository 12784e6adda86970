pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use app::{app_router, AppState};
pub use config::{CliConfig, ServerConfig};
pub use crate::core::{resolve, AddressResult, LookupKey, RaceCoordinator};
pub use utils::error::{CepError, ProviderFailure, RaceError, Result};
