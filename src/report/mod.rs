//! Report module - terminal tables and JSON export of results

pub mod export;
pub mod model_report;
pub mod summary;

pub use export::*;
pub use model_report::*;
pub use summary::*;
