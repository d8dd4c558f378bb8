pub mod carrier;
pub mod config;
pub mod environments;
pub mod error;
pub mod proxy;
pub mod server;

pub use config::ProxyConfig;
pub use environments::CarrierEnvironment;
pub use error::{ProxyError, Result};
pub use server::{build_router, AppState};
