//! Tariff reference data and rate lookup

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{PricingError, PricingResult, ValidationErrors};
use crate::models::{TariffItem, TariffRate};
use crate::unit::{Millicents, Pound};

/// Read-only access to tariff items, rates and zone maps
pub trait RateLookup: Send + Sync {
    fn tariff_item(&self, code: &str) -> PricingResult<&TariffItem>;

    /// Rate in millicents per unit for `code` at this weight, date and
    /// (for distance-banded items) mileage
    fn rate(
        &self,
        code: &str,
        weight: Pound,
        date: NaiveDate,
        miles: Option<u32>,
    ) -> PricingResult<Millicents>;

    /// Origin rate area for a postal code
    fn rate_area(&self, postal_code: &str) -> PricingResult<String>;

    /// Destination region for a postal code
    fn region(&self, postal_code: &str) -> PricingResult<String>;
}

/// Serialized form of the reference tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub tariff_items: Vec<TariffItem>,
    #[serde(default)]
    pub rates: Vec<TariffRate>,
    /// Five- or three-digit zip prefix to rate area
    #[serde(default)]
    pub rate_areas: BTreeMap<String, String>,
    /// Five- or three-digit zip prefix to region
    #[serde(default)]
    pub regions: BTreeMap<String, String>,
}

/// Indexed, validated reference tables
#[derive(Debug, Clone)]
pub struct RateTable {
    items: HashMap<String, TariffItem>,
    rates: HashMap<String, Vec<TariffRate>>,
    rate_areas: BTreeMap<String, String>,
    regions: BTreeMap<String, String>,
}

impl RateTable {
    pub fn new(data: ReferenceData) -> PricingResult<Self> {
        let mut errors = ValidationErrors::new();
        let mut items = HashMap::new();
        for item in data.tariff_items {
            if items.contains_key(&item.code) {
                errors.add("tariff_items", format!("duplicate code {}", item.code));
                continue;
            }
            items.insert(item.code.clone(), item);
        }

        let mut rates: HashMap<String, Vec<TariffRate>> = HashMap::new();
        for (index, rate) in data.rates.into_iter().enumerate() {
            let field = format!("rates[{index}]");
            if !items.contains_key(&rate.code) {
                errors.add(&field, format!("unknown tariff code {}", rate.code));
            }
            if rate.effective_date_lower >= rate.effective_date_upper {
                errors.add(&field, "effective date range is empty");
            }
            if rate.weight_lbs_lower >= rate.weight_lbs_upper {
                errors.add(&field, "weight range is empty");
            }
            if let (Some(lower), Some(upper)) = (rate.distance_miles_lower, rate.distance_miles_upper)
            {
                if lower >= upper {
                    errors.add(&field, "distance range is empty");
                }
            }
            if rate.rate_millicents.0 < 0 {
                errors.add(&field, "rate can not be negative");
            }
            rates.entry(rate.code.clone()).or_default().push(rate);
        }
        errors.into_result()?;

        debug!(
            items = items.len(),
            codes_with_rates = rates.len(),
            "Loaded tariff reference data"
        );

        Ok(Self {
            items,
            rates,
            rate_areas: data.rate_areas,
            regions: data.regions,
        })
    }

    pub fn from_json(json: &str) -> PricingResult<Self> {
        let data: ReferenceData = serde_json::from_str(json)
            .map_err(|e| PricingError::Config(format!("invalid reference data: {e}")))?;
        Self::new(data)
    }

    pub fn tariff_items(&self) -> impl Iterator<Item = &TariffItem> {
        self.items.values()
    }
}

/// Exact five-digit match first, then the three-digit prefix
fn zone_lookup<'a>(zones: &'a BTreeMap<String, String>, postal_code: &str) -> Option<&'a String> {
    let trimmed = postal_code.trim();
    let zip5 = trimmed.get(..5).unwrap_or(trimmed);
    zones
        .get(zip5)
        .or_else(|| zip5.get(..3).and_then(|zip3| zones.get(zip3)))
}

impl RateLookup for RateTable {
    fn tariff_item(&self, code: &str) -> PricingResult<&TariffItem> {
        self.items
            .get(code)
            .ok_or_else(|| PricingError::not_found("tariff item", code))
    }

    fn rate(
        &self,
        code: &str,
        weight: Pound,
        date: NaiveDate,
        miles: Option<u32>,
    ) -> PricingResult<Millicents> {
        let unresolved = || PricingError::NoApplicableRate {
            code: code.to_string(),
            weight,
            date,
            miles,
        };

        // Overlapping rows resolve to the most recently effective one
        let rate = self
            .rates
            .get(code)
            .into_iter()
            .flatten()
            .filter(|r| r.applies(code, weight, date, miles))
            .max_by_key(|r| (r.effective_date_lower, r.weight_lbs_lower))
            .ok_or_else(unresolved)?;

        debug!(code, %weight, %date, rate = %rate.rate_millicents, "Resolved tariff rate");
        Ok(rate.rate_millicents)
    }

    fn rate_area(&self, postal_code: &str) -> PricingResult<String> {
        zone_lookup(&self.rate_areas, postal_code)
            .cloned()
            .ok_or_else(|| PricingError::not_found("rate area", postal_code))
    }

    fn region(&self, postal_code: &str) -> PricingResult<String> {
        zone_lookup(&self.regions, postal_code)
            .cloned()
            .ok_or_else(|| PricingError::not_found("region", postal_code))
    }
}
