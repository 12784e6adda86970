// Domain layer: request-scoped models and the provider/config ports.

pub mod model;
pub mod ports;
