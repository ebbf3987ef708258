//! Shared types for KaiSheng
//!
//! These are the serializable shapes the engine reports and the CLI
//! renders:
//! - Block scopes and the resolved downtime policy
//! - Reason codes for blocked apps
//! - Usage limit and motion status
//! - Whole-system status snapshots

mod types;

pub use types::*;

/// Current version of the status snapshot format
pub const API_VERSION: u32 = 1;
