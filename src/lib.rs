//! # trove - versioned file sync against object storage
//!
//! Keeps a directory of large files in step with a versioned bucket. Which
//! version of each file belongs to the project is recorded in a `.trove.yml`
//! manifest that lives next to the code.

// Module declarations
pub mod config;
pub mod types;
pub mod hash;
pub mod transfer;
pub mod storage;
pub mod engine;
pub mod ui;
pub mod commands;

// Re-export commonly used types
pub use types::{Result, TroveError};
pub use config::Manifest;
pub use engine::{PushOutcome, Trove};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
