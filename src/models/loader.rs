//! Trained artifact persistence: the model and both encoding tables

use crate::config::ArtifactsConfig;
use crate::encoding::{Encoders, EncodingTable, AD_GROUP_FIELD, MONTH_FIELD};
use crate::models::inference::GbdtModel;
use anyhow::{ensure, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// The three artifacts a training run produces
pub struct ModelArtifacts {
    pub model: GbdtModel,
    pub encoders: Encoders,
}

/// Reads and writes trained artifacts in one directory
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    model_file: String,
    ad_group_file: String,
    month_file: String,
}

impl ArtifactStore {
    /// Store rooted at `dir` with the default file names
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let defaults = ArtifactsConfig::default();
        Self {
            dir: dir.as_ref().to_path_buf(),
            model_file: defaults.model_file,
            ad_group_file: defaults.ad_group_encoder_file,
            month_file: defaults.month_encoder_file,
        }
    }

    pub fn from_config(config: &ArtifactsConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            model_file: config.model_file.clone(),
            ad_group_file: config.ad_group_encoder_file.clone(),
            month_file: config.month_encoder_file.clone(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model_file)
    }

    pub fn ad_group_path(&self) -> PathBuf {
        self.dir.join(&self.ad_group_file)
    }

    pub fn month_path(&self) -> PathBuf {
        self.dir.join(&self.month_file)
    }

    /// Load all artifacts; fails if any of the three is missing or unreadable.
    pub fn load(&self) -> Result<ModelArtifacts> {
        let model_path = self.model_path();
        info!(path = %model_path.display(), "Loading revenue model");
        let model = GbdtModel::load(&model_path)?;

        let ad_group = load_table(&self.ad_group_path(), AD_GROUP_FIELD)?;
        let month = load_table(&self.month_path(), MONTH_FIELD)?;

        info!(
            dir = %self.dir.display(),
            ad_groups = ad_group.len(),
            months = month.len(),
            "Artifacts loaded successfully"
        );

        Ok(ModelArtifacts {
            model,
            encoders: Encoders::new(ad_group, month),
        })
    }

    pub fn save(&self, artifacts: &ModelArtifacts) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create artifact directory {}", self.dir.display()))?;

        artifacts.model.save(self.model_path())?;
        save_table(&self.ad_group_path(), &artifacts.encoders.ad_group)?;
        save_table(&self.month_path(), &artifacts.encoders.month)?;

        info!(dir = %self.dir.display(), "Model and encoders saved");
        Ok(())
    }
}

fn load_table(path: &Path, expected_field: &str) -> Result<EncodingTable> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read encoder from {}", path.display()))?;
    let table: EncodingTable = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse encoder {}", path.display()))?;

    ensure!(
        table.field() == expected_field,
        "encoder {} was fit for field {:?}, expected {:?}",
        path.display(),
        table.field(),
        expected_field
    );
    ensure!(
        table.classes().windows(2).all(|w| w[0] < w[1]),
        "encoder {} classes are not sorted and unique",
        path.display()
    );

    Ok(table)
}

fn save_table(path: &Path, table: &EncodingTable) -> Result<()> {
    let json = serde_json::to_string_pretty(table)?;
    fs::write(path, json).with_context(|| format!("Failed to write encoder to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let store = ArtifactStore::new("artifacts");
        assert_eq!(store.model_path(), PathBuf::from("artifacts/revenue_model.json"));
        assert_eq!(store.ad_group_path(), PathBuf::from("artifacts/ad_group_encoder.json"));
        assert_eq!(store.month_path(), PathBuf::from("artifacts/month_encoder.json"));
    }

    #[test]
    fn test_load_fails_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.load().is_err());
    }

    #[test]
    fn test_table_round_trip_and_field_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("month.json");
        let table = EncodingTable::fit(MONTH_FIELD, ["May", "April"]);

        save_table(&path, &table).unwrap();
        assert_eq!(load_table(&path, MONTH_FIELD).unwrap(), table);
        assert!(load_table(&path, AD_GROUP_FIELD).is_err());
    }
}
