//! Pipeline module - dataset loading, hypothesis testing, discretization and inference

pub mod discretizer;
pub mod hypothesis;
pub mod inference;
pub mod inputs;
pub mod loader;
pub mod missing;
pub mod schema;
pub mod target;

pub use discretizer::*;
pub use hypothesis::*;
pub use inference::*;
pub use inputs::*;
pub use loader::*;
pub use missing::*;
pub use schema::*;
pub use target::*;
