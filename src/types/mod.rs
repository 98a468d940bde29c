//! Type definitions for the revenue predictor

pub mod campaign;
pub mod prediction;

pub use campaign::{CampaignRecord, ManualInput, TrainingRow};
pub use prediction::{DerivedKpis, PredictionResult};
