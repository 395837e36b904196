pub mod clock;
pub mod cors;
