/// Insight Mock Server Library
///
/// This crate provides both a standalone binary and library components
/// for mocking the Insight address-activity API with an in-memory ledger.

pub mod handlers;
pub mod ledger;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use ledger::{ActivityLedger, Mode};
pub use server::{create_router, run_server, spawn_server};
pub use types::*;
