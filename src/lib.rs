//! Daily medication tracking library
//!
//! This library keeps a list of medications with a name, a dose quantity and a
//! scheduled time, tracks which ones were taken today, and clears the taken
//! flags once per calendar day. State lives in a local key-value store.

mod cli;
mod config;
mod errors;
mod helper;
mod medication;
mod store;
mod tracker;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use medication::*;
pub use store::*;
pub use tracker::*;
pub use types::*;
