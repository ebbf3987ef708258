//! Core policy engine for KaiSheng
//!
//! This crate is the heart of KaiSheng, containing:
//! - Downtime resolution (which schedule wins when windows overlap)
//! - Usage limit alerts (warnings and the daily ceiling)
//! - The walking restriction gate
//! - The engine that combines all three into per-app decisions

mod downtime;
mod engine;
mod events;
mod limits;
mod motion;

pub use downtime::*;
pub use engine::*;
pub use events::*;
pub use limits::*;
pub use motion::*;
