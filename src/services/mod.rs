pub mod proxy_service;
pub mod sweeper;
