pub mod config;
pub mod handlers;
pub mod observability;
pub mod server;
pub mod state;

pub use config::{AppConfig, CookieConfig, LoggingConfig, RpcConfig, ServerConfig};
pub use observability::init_tracing;
pub use server::{ServerBuilder, SsoBrokerServer, build_app};
pub use state::AppState;
