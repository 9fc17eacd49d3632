pub mod algorithm;
pub mod color;
pub mod config;
pub mod measurements;
pub mod plot;
