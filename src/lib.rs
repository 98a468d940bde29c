//! Campaign Revenue Predictor Library
//!
//! Feature engineering, gradient-boosted revenue regression, and an HTTP
//! API for scoring advertising campaign records and summarising uploads.

pub mod api;
pub mod config;
pub mod dataset;
pub mod eda;
pub mod encoding;
pub mod errors;
pub mod feature_extractor;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use encoding::Encoders;
pub use errors::Error;
pub use feature_extractor::{FeatureAssembler, FeatureDeriver, FeatureVector};
pub use models::inference::{GbdtModel, ScoringModel};
pub use service::PredictionService;
pub use types::{CampaignRecord, ManualInput, PredictionResult};
