pub mod handlers;
mod routes;
mod state;

pub use routes::{create_router, start_server};
pub use state::{AppState, EngineRegistry, StartOutcome};
