//! Prediction service: derive → encode → assemble → score → recompute KPIs.

use crate::dataset::CsvTable;
use crate::encoding::Encoders;
use crate::errors::{Error, ProcessingContext, Result};
use crate::feature_extractor::{DeriveMode, FeatureAssembler, FeatureDeriver, FeatureVector};
use crate::models::inference::ScoringModel;
use crate::types::{CampaignRecord, DerivedKpis, PredictionResult};
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

/// Scores campaign records with a loaded model and its encoders.
///
/// Both are read-only for the lifetime of the service and are injected at
/// construction so tests can substitute stub models.
#[derive(Clone)]
pub struct PredictionService {
    model: Arc<dyn ScoringModel>,
    encoders: Arc<Encoders>,
    deriver: FeatureDeriver,
    assembler: FeatureAssembler,
}

/// A record ready for scoring
struct PreparedRow {
    features: FeatureVector,
    unknown: Vec<String>,
}

impl PredictionService {
    pub fn new(model: Arc<dyn ScoringModel>, encoders: Arc<Encoders>) -> Self {
        Self {
            model,
            encoders,
            deriver: FeatureDeriver::new(),
            assembler: FeatureAssembler::new(),
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn encoders(&self) -> &Encoders {
        &self.encoders
    }

    /// Build the model input row for one record.
    pub fn features_for(&self, record: &CampaignRecord) -> FeatureVector {
        self.prepare(record).features
    }

    fn prepare(&self, record: &CampaignRecord) -> PreparedRow {
        let derived = self.deriver.derive(record, DeriveMode::Inference);
        let codes = self.encoders.encode(record);
        if !codes.unknown.is_empty() {
            debug!(
                ad_group = %record.ad_group,
                month = %record.month,
                unknown = ?codes.unknown,
                "Unseen category encoded with sentinel"
            );
        }

        PreparedRow {
            features: self.assembler.assemble(&derived, &codes),
            unknown: codes.unknown,
        }
    }

    /// Score a single record.
    pub fn predict_one(&self, record: &CampaignRecord) -> Result<PredictionResult> {
        let mut results = self.predict_batch(std::slice::from_ref(record))?;
        results
            .pop()
            .ok_or_else(|| anyhow::anyhow!("model returned no prediction"))
            .processing("record")
    }

    /// Score records row-wise; output order matches input order.
    ///
    /// Unknown categories degrade individual rows but never fail the batch.
    pub fn predict_batch(&self, records: &[CampaignRecord]) -> Result<Vec<PredictionResult>> {
        let prepared: Vec<PreparedRow> = records.par_iter().map(|r| self.prepare(r)).collect();
        let rows: Vec<FeatureVector> = prepared.iter().map(|p| p.features).collect();

        let predictions = self.model.predict(&rows).processing("model inference")?;
        if predictions.len() != records.len() {
            return Err(Error::processing(
                "model inference",
                anyhow::anyhow!(
                    "model returned {} predictions for {} rows",
                    predictions.len(),
                    records.len()
                ),
            ));
        }

        let degraded = prepared.iter().filter(|p| !p.unknown.is_empty()).count();
        if degraded > 0 {
            warn!(
                rows = records.len(),
                degraded,
                "Scored rows with categories unseen during training"
            );
        }

        Ok(records
            .iter()
            .zip(prepared)
            .zip(predictions)
            .map(|((record, prepared), revenue)| {
                PredictionResult::new(
                    record.ad_group.clone(),
                    record.month.clone(),
                    revenue,
                    DerivedKpis::against(record, revenue),
                    prepared.unknown,
                )
            })
            .collect())
    }

    /// Parse, validate and score an uploaded CSV body.
    ///
    /// Missing required columns reject the whole upload before the model runs.
    pub fn predict_csv(&self, bytes: &[u8]) -> Result<Vec<PredictionResult>> {
        let table = CsvTable::from_bytes(bytes)?;
        let records = table.campaign_records()?;
        debug!(rows = records.len(), "Validated CSV upload");
        self.predict_batch(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{AD_GROUP_FIELD, UNKNOWN_CATEGORY};
    use crate::models::inference::tests::LinearStub;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts how many times the model was invoked
    struct CountingStub {
        calls: AtomicUsize,
    }

    impl ScoringModel for CountingStub {
        fn name(&self) -> &str {
            "counting-stub"
        }

        fn predict(&self, rows: &[FeatureVector]) -> anyhow::Result<Vec<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0; rows.len()])
        }
    }

    fn encoders() -> Arc<Encoders> {
        let corpus = vec![
            CampaignRecord::new("Brand", "January", 1, 1, 1, 1.0),
            CampaignRecord::new("Generic", "February", 1, 1, 1, 1.0),
        ];
        Arc::new(Encoders::fit(&corpus))
    }

    fn service() -> PredictionService {
        PredictionService::new(Arc::new(LinearStub), encoders())
    }

    fn record() -> CampaignRecord {
        CampaignRecord::new("Brand", "January", 1000, 50, 5, 100.0)
            .with_sale_amount(250.0)
            .with_pnl(150.0)
    }

    #[test]
    fn test_predict_one_recomputes_kpis_against_prediction() {
        let result = service().predict_one(&record()).unwrap();

        // stub: 2.5 * 100 + 10
        assert_eq!(result.predicted_revenue, 260.0);
        assert_eq!(result.kpis.roi, 1.6);
        assert_eq!(result.kpis.cpm, 100.0);
        assert_eq!(result.kpis.revenue_per_click, 5.2);
        assert_eq!(result.kpis.revenue_per_conversion, 52.0);
        assert!(result.unknown_categories.is_empty());
    }

    #[test]
    fn test_predict_one_is_idempotent() {
        let service = service();
        let first = service.predict_one(&record()).unwrap();
        let second = service.predict_one(&record()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_batch_matches_single() {
        let service = service();
        let r = record();
        let batch = service.predict_batch(std::slice::from_ref(&r)).unwrap();
        assert_eq!(batch[0], service.predict_one(&r).unwrap());
    }

    #[test]
    fn test_batch_preserves_order() {
        let service = service();
        let records: Vec<CampaignRecord> = (0..64)
            .map(|i| CampaignRecord::new("Brand", "January", 1000, 10, 1, i as f64))
            .collect();

        let results = service.predict_batch(&records).unwrap();

        assert_eq!(results.len(), 64);
        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.predicted_revenue, 2.5 * i as f64 + 10.0);
        }
    }

    #[test]
    fn test_unknown_ad_group_is_scored_with_sentinel() {
        let service = service();
        let novel = CampaignRecord::new("Display", "January", 1000, 50, 5, 100.0);

        let features = service.features_for(&novel);
        assert_eq!(features.get("AdGroupEncoded"), Some(UNKNOWN_CATEGORY as f32));

        let results = service.predict_batch(&[record(), novel]).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].predicted_revenue, 260.0);
        assert_eq!(results[1].unknown_categories, vec![AD_GROUP_FIELD.to_string()]);
        assert!(results[1].is_degraded());
        assert!(!results[0].is_degraded());
    }

    #[test]
    fn test_csv_missing_month_never_reaches_model() {
        let model = Arc::new(CountingStub {
            calls: AtomicUsize::new(0),
        });
        let service = PredictionService::new(model.clone(), encoders());
        let csv = "Impressions,Clicks,CTR,Conversions,Conv Rate,Cost,CPC,Sale Amount,P&L,Ad Group\n\
                   1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand";

        match service.predict_csv(csv.as_bytes()) {
            Err(Error::Schema { missing }) => assert_eq!(missing, vec!["Month"]),
            other => panic!("expected schema error, got {other:?}"),
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_csv_batch_matches_single_record() {
        let service = service();
        let csv = "Impressions,Clicks,CTR,Conversions,Conv Rate,Cost,CPC,Sale Amount,P&L,Ad Group,Month\n\
                   1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Brand,January\n\
                   1000,50,5.0,5,0.1,100.0,2.0,250.0,150.0,Unseen,January";

        let results = service.predict_csv(csv.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].unknown_categories, vec![AD_GROUP_FIELD.to_string()]);

        let single = service
            .predict_one(&record().with_ctr(5.0))
            .unwrap();
        assert_eq!(results[0].predicted_revenue, single.predicted_revenue);
        assert_eq!(results[0].kpis, single.kpis);
    }

    #[test]
    fn test_model_row_count_mismatch_is_processing_error() {
        struct ShortStub;
        impl ScoringModel for ShortStub {
            fn name(&self) -> &str {
                "short"
            }
            fn predict(&self, _rows: &[FeatureVector]) -> anyhow::Result<Vec<f64>> {
                Ok(Vec::new())
            }
        }

        let service = PredictionService::new(Arc::new(ShortStub), encoders());
        assert!(matches!(
            service.predict_one(&record()),
            Err(Error::Processing { .. })
        ));
    }
}
