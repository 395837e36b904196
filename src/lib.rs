pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use models::cache::ResponseCache;
pub use server::{build_router, AppState};
pub use services::proxy_service::ProxyService;
