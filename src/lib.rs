pub mod aggregate;
pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod party;
pub mod server;
pub mod storage;
