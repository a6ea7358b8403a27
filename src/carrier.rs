//! Carrier performance selection
//!
//! A shipment is awarded to the carrier performance record of its traffic
//! distribution grouping that has received the fewest offers so far, breaking
//! ties by the best value score. Only enrolled carriers whose performance
//! period covers the book date and whose rate cycle covers the requested
//! pickup date are eligible.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{PricingError, PricingResult};
use crate::models::{
    CarrierPerformance, GroupingId, GroupingKey, PerformanceCandidate, Shipment,
    TrafficDistributionGrouping,
};
use crate::rates::RateLookup;
use crate::store::Transaction;

/// Code of service for household goods moves
pub const DEFAULT_CODE_OF_SERVICE: &str = "D";

/// Fewest offers first, then highest score, then lowest id
fn compare_candidates(a: &CarrierPerformance, b: &CarrierPerformance) -> Ordering {
    a.offer_count
        .cmp(&b.offer_count)
        .then_with(|| b.best_value_score.cmp(&a.best_value_score))
        .then_with(|| a.id.cmp(&b.id))
}

/// Best eligible performance among `candidates`, if any
pub fn select_best_performance<'a>(
    candidates: &'a [PerformanceCandidate],
    grouping_id: &GroupingId,
    book_date: NaiveDate,
    pickup_date: NaiveDate,
) -> Option<&'a CarrierPerformance> {
    candidates
        .iter()
        .filter(|c| c.carrier_enrolled)
        .map(|c| &c.performance)
        .filter(|p| p.grouping_id == *grouping_id)
        .filter(|p| p.covers(book_date, pickup_date))
        .min_by(|a, b| compare_candidates(a, b))
}

/// Grouping key for a move between two postal codes
pub fn derive_grouping_key(
    rates: &dyn RateLookup,
    origin_postal_code: &str,
    destination_postal_code: &str,
    code_of_service: &str,
) -> PricingResult<GroupingKey> {
    Ok(GroupingKey {
        source_rate_area: rates.rate_area(origin_postal_code)?,
        destination_region: rates.region(destination_postal_code)?,
        code_of_service: code_of_service.to_string(),
    })
}

/// Look up the grouping for `key`, creating it if it does not exist yet.
/// Losing an insert race to another caller falls back to their row.
pub async fn fetch_or_create_grouping(
    tx: &mut dyn Transaction,
    key: &GroupingKey,
) -> PricingResult<TrafficDistributionGrouping> {
    if let Some(existing) = tx.grouping_by_key(key).await? {
        return Ok(existing);
    }

    let grouping = TrafficDistributionGrouping {
        id: GroupingId::new(),
        key: key.clone(),
    };
    match tx.insert_grouping(&grouping).await {
        Ok(()) => {
            info!(%key, grouping_id = %grouping.id, "Created traffic distribution grouping");
            Ok(grouping)
        }
        Err(err) if err.is_conflict() => {
            debug!(%key, "Grouping created concurrently, re-fetching");
            tx.grouping_by_key(key)
                .await?
                .ok_or_else(|| PricingError::not_found("traffic distribution grouping", key))
        }
        Err(err) => Err(err.into()),
    }
}

/// Selects and assigns carrier performance records through the store
#[derive(Clone)]
pub struct CarrierSelector {
    rates: Arc<dyn RateLookup>,
    code_of_service: String,
}

impl CarrierSelector {
    pub fn new(rates: Arc<dyn RateLookup>) -> Self {
        Self {
            rates,
            code_of_service: DEFAULT_CODE_OF_SERVICE.to_string(),
        }
    }

    pub fn with_code_of_service(mut self, code: impl Into<String>) -> Self {
        self.code_of_service = code.into();
        self
    }

    pub fn grouping_key_for(&self, shipment: &Shipment) -> PricingResult<GroupingKey> {
        derive_grouping_key(
            self.rates.as_ref(),
            &shipment.pickup_address()?.postal_code,
            &shipment.delivery_address()?.postal_code,
            &self.code_of_service,
        )
    }

    /// Best performance for an existing grouping. Read only.
    pub async fn select_carrier_performance(
        &self,
        tx: &dyn Transaction,
        key: &GroupingKey,
        book_date: NaiveDate,
        pickup_date: NaiveDate,
    ) -> PricingResult<CarrierPerformance> {
        let grouping = tx
            .grouping_by_key(key)
            .await?
            .ok_or_else(|| PricingError::not_found("traffic distribution grouping", key))?;
        self.select_for_grouping(tx, &grouping.id, book_date, pickup_date)
            .await
    }

    pub async fn select_for_grouping(
        &self,
        tx: &dyn Transaction,
        grouping_id: &GroupingId,
        book_date: NaiveDate,
        pickup_date: NaiveDate,
    ) -> PricingResult<CarrierPerformance> {
        let candidates = tx.performances_for_grouping(grouping_id).await?;
        debug!(
            %grouping_id,
            candidates = candidates.len(),
            %book_date,
            %pickup_date,
            "Selecting carrier performance"
        );
        select_best_performance(&candidates, grouping_id, book_date, pickup_date)
            .cloned()
            .ok_or_else(|| {
                PricingError::not_found(
                    "carrier performance",
                    format!("grouping {grouping_id} book {book_date} pickup {pickup_date}"),
                )
            })
    }

    /// Derive the shipment's grouping, select a performance and link both to
    /// the shipment. The caller persists the shipment.
    pub async fn assign_carrier(
        &self,
        tx: &mut dyn Transaction,
        shipment: &mut Shipment,
    ) -> PricingResult<CarrierPerformance> {
        let key = self.grouping_key_for(shipment)?;
        let grouping = fetch_or_create_grouping(tx, &key).await?;
        let performance = self
            .select_for_grouping(
                tx,
                &grouping.id,
                shipment.book_date()?,
                shipment.requested_pickup_date()?,
            )
            .await?;

        shipment.traffic_distribution_grouping_id = Some(grouping.id);
        shipment.carrier_performance_id = Some(performance.id);
        info!(
            shipment_id = %shipment.id,
            performance_id = %performance.id,
            carrier_id = %performance.carrier_id,
            "Assigned carrier performance"
        );
        Ok(performance)
    }
}
