pub mod config;
pub mod deriver;
pub mod error;
pub mod feed;
pub mod latency;
pub mod schema;
pub mod sink;
pub mod types;
pub mod view;
