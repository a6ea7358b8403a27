//! Shipment recalculation
//!
//! Rebuilds a delivered shipment's priced basket after its facts changed:
//! missing base charges are created, base and SIT quantities are refreshed
//! from the current weight and distance, and every priceable item is priced
//! again. One item failing to price never stops the rest.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{pricing_action, PricingAction};
use crate::carrier::CarrierSelector;
use crate::error::{PricingError, PricingResult, ValidationErrors};
use crate::models::{
    tariff::{SIT_ADDITIONAL_DAYS_CODE, SIT_FIRST_DAY_CODE},
    BaseCategory, LineItem, LineItemId, LineItemStatus, MeasurementUnit, Shipment, ShipmentId,
    SitLocation, SitStatus, StorageInTransit,
};
use crate::pricing::CostCalculator;
use crate::rates::RateLookup;
use crate::routing::{distance_with_timeout, DistancePlanner};
use crate::store::{RecordStore, Transaction};
use crate::unit::{BaseQuantity, DiscountRate, FeeAndRate};

/// One item (or the shipment's own linehaul charge) that could not be priced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricingFailure {
    /// `None` for the shipment linehaul charge
    pub line_item_id: Option<LineItemId>,
    pub tariff_code: String,
    pub reason: String,
}

/// Outcome of one recalculation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecalculationReport {
    pub shipment_id: ShipmentId,
    /// Every line item of the shipment after the run, oldest first
    pub line_items: Vec<LineItem>,
    pub created: Vec<LineItemId>,
    pub priced: Vec<LineItemId>,
    pub unpriced: Vec<LineItemId>,
    pub skipped_invoiced: Vec<LineItemId>,
    pub failures: Vec<PricingFailure>,
    pub shipment_charge: Option<FeeAndRate>,
}

impl RecalculationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A line item that counts as a mandatory base charge: a base category code,
/// not tied to a SIT, and not a pre-approval item
fn base_category(rates: &dyn RateLookup, item: &LineItem) -> Option<BaseCategory> {
    let category = BaseCategory::from_code(&item.tariff_code)?;
    if item.storage_in_transit_id.is_some() {
        return None;
    }
    let pre_approval = rates
        .tariff_item(&item.tariff_code)
        .map(|t| t.requires_pre_approval)
        .unwrap_or(false);
    (!pre_approval).then_some(category)
}

/// Base categories with no line item yet
pub fn missing_base_categories(rates: &dyn RateLookup, items: &[LineItem]) -> Vec<BaseCategory> {
    let present: BTreeSet<BaseCategory> = items
        .iter()
        .filter_map(|item| base_category(rates, item))
        .collect();
    BaseCategory::ALL
        .into_iter()
        .filter(|c| !present.contains(c))
        .collect()
}

/// Every base category must appear exactly once
pub fn verify_base_line_items(rates: &dyn RateLookup, items: &[LineItem]) -> PricingResult<()> {
    let mut counts = [0usize; BaseCategory::ALL.len()];
    for category in items.iter().filter_map(|item| base_category(rates, item)) {
        counts[category.index()] += 1;
    }
    for category in BaseCategory::ALL {
        let count = counts[category.index()];
        if count != 1 {
            return Err(PricingError::validation(
                "line_items",
                format!("expected exactly one {category} base line item, found {count}"),
            ));
        }
    }
    Ok(())
}

fn pounds(shipment_weight: i64) -> BaseQuantity {
    BaseQuantity::from_units(shipment_weight)
}

/// Re-runs carrier selection and pricing for shipments
#[derive(Clone)]
pub struct Recalculator {
    store: Arc<dyn RecordStore>,
    calculator: CostCalculator,
    selector: CarrierSelector,
    planner: Arc<dyn DistancePlanner>,
    distance_timeout: Duration,
}

impl Recalculator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        calculator: CostCalculator,
        selector: CarrierSelector,
        planner: Arc<dyn DistancePlanner>,
        distance_timeout: Duration,
    ) -> Self {
        Self {
            store,
            calculator,
            selector,
            planner,
            distance_timeout,
        }
    }

    /// Rebuild and re-price the basket of a delivered shipment. Running it
    /// twice without a change in between produces the same basket.
    pub async fn recalculate_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> PricingResult<RecalculationReport> {
        let mut tx = self.store.begin().await?;
        let mut shipment = load_shipment(tx.as_ref(), shipment_id).await?;
        let report = self.recalculate_in(tx.as_mut(), &mut shipment).await?;
        tx.commit().await?;
        Ok(report)
    }

    /// Mark an in-transit shipment delivered, deliver its destination SITs
    /// on the same date and price everything
    pub async fn deliver_and_price(
        &self,
        shipment_id: &ShipmentId,
        delivery_date: NaiveDate,
    ) -> PricingResult<RecalculationReport> {
        let mut tx = self.store.begin().await?;
        let mut shipment = load_shipment(tx.as_ref(), shipment_id).await?;
        shipment.deliver(delivery_date)?;

        let mut delivered = Vec::new();
        let mut errors = ValidationErrors::new();
        for mut sit in tx.sits_for_shipment(shipment_id).await? {
            if sit.status == SitStatus::InSit && sit.location == SitLocation::Destination {
                sit.deliver(delivery_date)?;
                errors.append_prefixed(&format!("storage_in_transit.{}", sit.id), sit.validate());
                delivered.push(sit);
            }
        }
        errors.into_result()?;
        for sit in &delivered {
            tx.save_sit(sit).await?;
            debug!(sit_id = %sit.id, "Delivered destination SIT with shipment");
        }

        let report = self.recalculate_in(tx.as_mut(), &mut shipment).await?;
        tx.commit().await?;
        info!(shipment_id = %shipment_id, %delivery_date, "Shipment delivered and priced");
        Ok(report)
    }

    async fn recalculate_in(
        &self,
        tx: &mut dyn Transaction,
        shipment: &mut Shipment,
    ) -> PricingResult<RecalculationReport> {
        if !shipment.status.is_priceable() {
            return Err(PricingError::write_conflict(format!(
                "shipment {} is {} and cannot be priced",
                shipment.id, shipment.status
            )));
        }
        let weight = shipment.net_weight()?;

        let miles = distance_with_timeout(
            self.planner.as_ref(),
            shipment.pickup_address()?,
            shipment.delivery_address()?,
            self.distance_timeout,
        )
        .await?;
        let discount = self.resolve_discount(tx, shipment).await?;

        let now = Utc::now();
        let mut items = tx.line_items_for_shipment(&shipment.id).await?;
        let mut created = Vec::new();

        for category in missing_base_categories(self.calculator.rates(), &items) {
            let item = LineItem::base(shipment.id, category, now);
            debug!(shipment_id = %shipment.id, code = category.code(), "Creating base line item");
            created.push(item.id);
            items.push(item);
        }

        for item in items.iter_mut() {
            if item.is_invoiced() {
                continue;
            }
            if let Some(category) = base_category(self.calculator.rates(), item) {
                item.quantity_1 = pounds(weight.0);
                item.quantity_2 = match category {
                    BaseCategory::Linehaul | BaseCategory::FuelSurcharge => {
                        BaseQuantity::from_units(i64::from(miles))
                    }
                    _ => BaseQuantity::ZERO,
                };
            }
        }

        let sits = tx.sits_for_shipment(&shipment.id).await?;
        for sit in &sits {
            self.ensure_sit_items(&mut items, &mut created, shipment, sit, now);
        }

        let mut report = RecalculationReport {
            shipment_id: shipment.id,
            line_items: Vec::new(),
            created,
            priced: Vec::new(),
            unpriced: Vec::new(),
            skipped_invoiced: Vec::new(),
            failures: Vec::new(),
            shipment_charge: None,
        };

        match self
            .calculator
            .compute_shipment_charge(shipment, miles, discount)
        {
            Ok(charge) => {
                shipment.linehaul_charge = Some(charge);
                report.shipment_charge = Some(charge);
            }
            Err(err) => {
                warn!(shipment_id = %shipment.id, "Linehaul charge failed: {}", err);
                shipment.linehaul_charge = None;
                report.failures.push(PricingFailure {
                    line_item_id: None,
                    tariff_code: self.calculator.linehaul_code().to_string(),
                    reason: err.to_string(),
                });
            }
        }

        for item in items.iter_mut() {
            if item.is_invoiced() {
                report.skipped_invoiced.push(item.id);
                continue;
            }
            self.price_item(item, shipment, discount, &mut report);
            tx.save_line_item(item).await?;
        }
        tx.save_shipment(shipment).await?;

        report.line_items = tx.line_items_for_shipment(&shipment.id).await?;
        info!(
            shipment_id = %shipment.id,
            created = report.created.len(),
            priced = report.priced.len(),
            unpriced = report.unpriced.len(),
            failed = report.failures.len(),
            "Recalculated shipment"
        );
        Ok(report)
    }

    /// Keep the linked performance while its windows still cover the
    /// shipment's dates, otherwise select again
    async fn resolve_discount(
        &self,
        tx: &mut dyn Transaction,
        shipment: &mut Shipment,
    ) -> PricingResult<DiscountRate> {
        let book_date = shipment.book_date()?;
        let pickup_date = shipment.requested_pickup_date()?;

        if let Some(id) = shipment.carrier_performance_id {
            if let Some(performance) = tx.carrier_performance(&id).await? {
                if performance.covers(book_date, pickup_date) {
                    debug!(performance_id = %id, "Reusing linked carrier performance");
                    return Ok(performance.linehaul_rate);
                }
            }
            info!(
                shipment_id = %shipment.id,
                performance_id = %id,
                "Linked carrier performance no longer covers shipment dates"
            );
        }

        let performance = self.selector.assign_carrier(tx, shipment).await?;
        Ok(performance.linehaul_rate)
    }

    /// Make sure a SIT with both dates known has its first-day and
    /// additional-days items, with quantities matching its current stay
    fn ensure_sit_items(
        &self,
        items: &mut Vec<LineItem>,
        created: &mut Vec<LineItemId>,
        shipment: &Shipment,
        sit: &StorageInTransit,
        now: DateTime<Utc>,
    ) {
        let Some(days) = sit.chargeable_days() else {
            return;
        };
        let weight = shipment.net_weight.map(|w| w.0).unwrap_or_default();

        for code in [SIT_FIRST_DAY_CODE, SIT_ADDITIONAL_DAYS_CODE] {
            let quantity_2 = if code == SIT_ADDITIONAL_DAYS_CODE {
                BaseQuantity::from_units((days - 1).max(0))
            } else {
                BaseQuantity::ZERO
            };

            let existing = items
                .iter_mut()
                .find(|li| li.storage_in_transit_id == Some(sit.id) && li.tariff_code == code);
            match existing {
                Some(item) if item.is_invoiced() => {}
                Some(item) => {
                    item.location = sit.location.line_item_location();
                    item.quantity_1 = pounds(weight);
                    item.quantity_2 = quantity_2;
                }
                None => {
                    let mut item =
                        LineItem::new(shipment.id, code, sit.location.line_item_location(), now);
                    item.status = LineItemStatus::Approved;
                    item.approved_date = Some(now);
                    item.storage_in_transit_id = Some(sit.id);
                    item.quantity_1 = pounds(weight);
                    item.quantity_2 = quantity_2;
                    debug!(sit_id = %sit.id, code, "Creating SIT line item");
                    created.push(item.id);
                    items.push(item);
                }
            }
        }
    }

    fn price_item(
        &self,
        item: &mut LineItem,
        shipment: &Shipment,
        discount: DiscountRate,
        report: &mut RecalculationReport,
    ) {
        match self.evaluate(item, shipment, discount) {
            Ok(Evaluation::Priced(charge)) => {
                item.set_price(charge);
                report.priced.push(item.id);
            }
            Ok(Evaluation::Cleared(unit)) => {
                item.clear_price();
                report.unpriced.push(item.id);
                if unit == MeasurementUnit::ActualCost {
                    debug!(line_item_id = %item.id, "Actual-cost item has no amounts, cleared");
                }
            }
            Ok(Evaluation::Untouched) => {}
            Err(err) => {
                warn!(
                    line_item_id = %item.id,
                    code = %item.tariff_code,
                    "Line item pricing failed: {}",
                    err
                );
                item.clear_price();
                report.failures.push(PricingFailure {
                    line_item_id: Some(item.id),
                    tariff_code: item.tariff_code.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    fn evaluate(
        &self,
        item: &LineItem,
        shipment: &Shipment,
        discount: DiscountRate,
    ) -> PricingResult<Evaluation> {
        let tariff = self.calculator.rates().tariff_item(&item.tariff_code)?;
        Ok(match pricing_action(item, tariff, shipment) {
            PricingAction::Price => Evaluation::Priced(
                self.calculator
                    .compute_line_item_charge(item, shipment, discount)?,
            ),
            PricingAction::Clear => Evaluation::Cleared(tariff.measurement_unit),
            PricingAction::Skip => Evaluation::Untouched,
        })
    }
}

enum Evaluation {
    Priced(FeeAndRate),
    Cleared(MeasurementUnit),
    Untouched,
}

async fn load_shipment(tx: &dyn Transaction, id: &ShipmentId) -> PricingResult<Shipment> {
    tx.shipment(id)
        .await?
        .ok_or_else(|| PricingError::not_found("shipment", id))
}
