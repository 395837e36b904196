pub mod cache;
pub mod in_flight;
