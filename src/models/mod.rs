//! Revenue model: inference, persistence, training and evaluation

pub mod evaluation;
pub mod inference;
pub mod loader;
pub mod training;

pub use evaluation::RegressionMetrics;
pub use inference::{GbdtModel, GbdtParams, ScoringModel};
pub use loader::{ArtifactStore, ModelArtifacts};
pub use training::{train, train_from_path, TrainingReport};
