//! JSON datasets for the CLI: reference tables plus the records to seed a
//! store with

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

use crate::error::{PricingError, PricingResult};
use crate::rates::{RateTable, ReferenceData};
use crate::store::{MemoryStore, Records};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub reference: ReferenceData,
    #[serde(default)]
    pub records: Records,
}

impl Dataset {
    pub fn from_json(json: &str) -> PricingResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| PricingError::Config(format!("invalid dataset: {e}")))
    }

    pub async fn load(path: &Path) -> PricingResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| PricingError::Config(format!("cannot read {}: {e}", path.display())))?;
        let dataset = Self::from_json(&content)?;
        debug!(
            path = %path.display(),
            shipments = dataset.records.shipments.len(),
            tariff_items = dataset.reference.tariff_items.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    /// Validate the reference tables and seed a store with the records
    pub fn into_parts(self) -> PricingResult<(Arc<RateTable>, MemoryStore)> {
        let rates = RateTable::new(self.reference)?;
        let store = MemoryStore::from_records(self.records)?;
        Ok((Arc::new(rates), store))
    }
}

/// Reference tables alone, either bare or wrapped in a dataset
pub async fn load_reference(path: &Path) -> PricingResult<RateTable> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| PricingError::Config(format!("cannot read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| PricingError::Config(format!("invalid reference data: {e}")))?;
    let data = match value.get("reference") {
        Some(reference) => serde_json::from_value(reference.clone()),
        None => serde_json::from_value(value),
    }
    .map_err(|e| PricingError::Config(format!("invalid reference data: {e}")))?;
    RateTable::new(data)
}
