//! Recompute and persist the cached derived fields of one venture.

use chrono::Utc;
use tracing::debug;

use impact_metrics::{derive_fields, DerivedFields};

use crate::error::PipelineError;
use crate::store::{RecordFilter, RecordStore};

/// Reload a venture's metrics and activities, derive its fields and write
/// them back.
///
/// Depends only on the stored rows, so running it twice in a row writes the
/// same values. No activity row is written.
pub async fn recalculate_venture(
    store: &dyn RecordStore,
    venture_id: &str,
) -> Result<DerivedFields, PipelineError> {
    if store.venture(venture_id).await?.is_none() {
        return Err(PipelineError::not_found("venture", venture_id));
    }

    let filter = RecordFilter::for_venture(venture_id);
    let metrics = store.metrics(&filter).await?;
    let activities = store.activities(&filter).await?;

    let fields = derive_fields(&metrics, &activities);
    store.update_derived_fields(venture_id, &fields, Utc::now()).await?;

    debug!(
        venture_id = %venture_id,
        metrics = metrics.len(),
        activities = activities.len(),
        gedsi_score = fields.gedsi_score,
        "Derived fields updated"
    );

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use impact_metrics::{GedsiCategory, GedsiMetric, MetricStatus, Venture};

    #[tokio::test]
    async fn test_recalculation_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let venture = Venture::new("Acme", "Retail");
        store.insert_venture(&venture).await.unwrap();
        store
            .insert_metric(
                &GedsiMetric::new(&venture.id, "OI.1", "Women reached", GedsiCategory::Gender)
                    .with_values(100.0, 50.0)
                    .with_status(MetricStatus::Completed),
            )
            .await
            .unwrap();

        let first = recalculate_venture(&store, &venture.id).await.unwrap();
        let second = recalculate_venture(&store, &venture.id).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.gedsi_compliance_rate, 100);
        assert_eq!(first.women_empowered, 50);

        let stored = store.venture(&venture.id).await.unwrap().unwrap();
        assert_eq!(stored.derived, second);
        assert!(stored.calculated_at.is_some());
        assert_eq!(store.activities(&RecordFilter::all()).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_venture_without_metrics_has_zero_compliance() {
        let store = SqliteStore::open_in_memory().unwrap();
        let venture = Venture::new("Acme", "Retail");
        store.insert_venture(&venture).await.unwrap();

        let fields = recalculate_venture(&store, &venture.id).await.unwrap();
        assert_eq!(fields.gedsi_compliance_rate, 0);
        assert_eq!(fields, DerivedFields::default());
    }

    #[tokio::test]
    async fn test_unknown_venture_is_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = recalculate_venture(&store, "missing").await.unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { entity: "venture", .. }));
    }
}
