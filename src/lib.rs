pub mod changes;
pub mod cli;
pub mod command;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod orchestrator;
pub mod project;
pub mod repo;
pub mod updates;

pub use error::{Result, UpdaterError};
