pub mod config;
pub mod error;
pub mod metrics;
pub mod protocol;
pub mod routes;
pub mod session;
pub mod state;
pub mod transport;
pub mod validation;

pub use config::ServerConfig;
pub use routes::build_router;
pub use state::AppState;
