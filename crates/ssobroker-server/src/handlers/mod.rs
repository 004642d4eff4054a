pub mod api;
pub mod browser;
pub mod error;
pub mod health;
pub mod rpc;

pub use error::ApiError;
pub use health::healthz;
