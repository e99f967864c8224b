pub mod collector;
pub mod config;
pub mod gateway;
pub mod normalizer;
pub mod server;
pub mod severity;
pub mod types;
