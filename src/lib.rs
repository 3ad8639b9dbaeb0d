pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod snapshot;
pub mod types;
