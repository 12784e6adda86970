// Application layer: the HTTP boundary around the race coordinator.

pub mod server;

pub use server::{app_router, build_coordinator, serve, ApiError, AppState};
