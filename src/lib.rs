pub mod config;
pub mod dns;
pub mod engine;
pub mod ip;
pub mod secrets;
