// Adapters layer: concrete implementations for external systems.

pub mod http_provider;

pub use http_provider::{HttpProvider, ProviderPreset};
