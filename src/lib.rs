pub mod cli;
pub mod commands;
pub mod config;
pub mod date;
pub mod error;
pub mod history;
pub mod metadata;
pub mod migrate;
pub mod scoring;
pub mod server;
pub mod storage;
pub mod store;
pub mod tools;
pub mod types;
