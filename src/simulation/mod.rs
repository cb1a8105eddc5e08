pub mod cascade;
pub mod config;
pub mod shock;
pub mod simulator;
pub mod sink;
pub mod time_series;
