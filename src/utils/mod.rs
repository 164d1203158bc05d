//! Utility helpers for terminal styling and progress display

pub mod progress;
pub mod styling;

pub use progress::*;
pub use styling::*;
