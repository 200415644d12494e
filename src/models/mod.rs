//! VQA model abstraction
//!
//! Provides a unified trait for the models being compared:
//! - external predictor commands (one process per prediction)
//! - fixed answer vocabularies for classifier-style models

pub mod command_backend;
pub mod traits;
pub mod vocabulary;

pub use command_backend::CommandModel;
pub use traits::{measure_sync, ModelConfig, VqaModel};
pub use vocabulary::Vocabulary;
