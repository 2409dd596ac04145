pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod security;
pub mod server;
pub mod storage;
pub mod tasks;
