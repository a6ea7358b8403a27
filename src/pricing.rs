//! Shipment and line item cost calculation

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

use crate::error::{PricingError, PricingResult};
use crate::models::{DiscountType, LineItem, MeasurementUnit, Shipment, TariffItem};
use crate::rates::RateLookup;
use crate::unit::{BaseQuantity, Cents, DiscountRate, FeeAndRate, Millicents};

pub const DEFAULT_LINEHAUL_CODE: &str = "LHS";

/// Prices shipments and line items from the tariff tables
#[derive(Clone)]
pub struct CostCalculator {
    rates: Arc<dyn RateLookup>,
    linehaul_code: String,
}

impl CostCalculator {
    pub fn new(rates: Arc<dyn RateLookup>) -> Self {
        Self {
            rates,
            linehaul_code: DEFAULT_LINEHAUL_CODE.to_string(),
        }
    }

    pub fn with_linehaul_code(mut self, code: impl Into<String>) -> Self {
        self.linehaul_code = code.into();
        self
    }

    pub fn rates(&self) -> &dyn RateLookup {
        self.rates.as_ref()
    }

    pub fn linehaul_code(&self) -> &str {
        &self.linehaul_code
    }

    /// Linehaul charge for the whole shipment: rate per cwt-mile for the
    /// shipment's weight bracket, distance band and book date.
    pub fn compute_shipment_charge(
        &self,
        shipment: &Shipment,
        miles: u32,
        discount: DiscountRate,
    ) -> PricingResult<FeeAndRate> {
        let weight = shipment.net_weight()?;
        let book_date = shipment.book_date()?;
        let rate = self
            .rates
            .rate(&self.linehaul_code, weight, book_date, Some(miles))?;
        let units = checked_mul(weight.to_cwt(), Decimal::from(miles))?;
        let charge = discounted_charge(rate, units, discount)?;

        debug!(
            shipment_id = %shipment.id,
            miles,
            fee = %charge.fee,
            rate = %charge.rate,
            "Computed shipment linehaul charge"
        );
        Ok(charge)
    }

    /// Charge for one line item. The tariff item decides the billing unit
    /// and whether the carrier discount applies.
    pub fn compute_line_item_charge(
        &self,
        item: &LineItem,
        shipment: &Shipment,
        discount: DiscountRate,
    ) -> PricingResult<FeeAndRate> {
        let tariff = self.rates.tariff_item(&item.tariff_code)?;
        let weight = shipment.net_weight()?;
        let book_date = shipment.book_date()?;
        let (units, miles) = billing_units(tariff, item)?;
        let rate = self.rates.rate(&tariff.code, weight, book_date, miles)?;
        let discount = match tariff.discount_type {
            DiscountType::NonDiscountable => DiscountRate::NONE,
            DiscountType::Linehaul | DiscountType::Sit => discount,
        };
        let charge = discounted_charge(rate, units, discount)?;

        debug!(
            line_item_id = %item.id,
            code = %tariff.code,
            %units,
            fee = %charge.fee,
            "Computed line item charge"
        );
        Ok(charge)
    }
}

/// Units billed and, for distance-banded items, the miles used to pick the
/// rate band
fn billing_units(tariff: &TariffItem, item: &LineItem) -> PricingResult<(Decimal, Option<u32>)> {
    let q1 = item.quantity_1.to_decimal();
    let q2 = item.quantity_2.to_decimal();
    let cwt = q1 / Decimal::ONE_HUNDRED;

    let billed = match tariff.measurement_unit {
        MeasurementUnit::Weight => (cwt, None),
        MeasurementUnit::WeightDistance => {
            (checked_mul(cwt, q2)?, Some(whole_miles(item.quantity_2)?))
        }
        MeasurementUnit::Volume | MeasurementUnit::Each => (q1, None),
        MeasurementUnit::Distance => (q1, Some(whole_miles(item.quantity_1)?)),
        MeasurementUnit::Days => (checked_mul(cwt, q2)?, None),
        MeasurementUnit::Flat => (Decimal::ONE, None),
        MeasurementUnit::ActualCost => {
            let cents = item
                .actual_amount_cents
                .or(item.estimate_amount_cents)
                .ok_or_else(|| {
                    PricingError::validation(
                        "estimate_amount_cents",
                        "an estimate or actual amount is required to price this item",
                    )
                })?;
            (cents.to_decimal() / Decimal::ONE_HUNDRED, None)
        }
    };
    Ok(billed)
}

fn whole_miles(quantity: BaseQuantity) -> PricingResult<u32> {
    quantity
        .to_decimal()
        .round()
        .to_u32()
        .ok_or_else(|| PricingError::Arithmetic(format!("{} is not a valid mileage", quantity.0)))
}

fn checked_mul(a: Decimal, b: Decimal) -> PricingResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| PricingError::Arithmetic(format!("{a} * {b} overflows")))
}

/// Discount the per-unit rate, multiply out in exact millicents and round to
/// cents once.
fn discounted_charge(
    rate: Millicents,
    units: Decimal,
    discount: DiscountRate,
) -> PricingResult<FeeAndRate> {
    let unit_rate = discount.apply(rate.to_decimal());
    let total = checked_mul(unit_rate, units)?;
    Ok(FeeAndRate {
        fee: Cents::from_millicents(total)?,
        rate: Millicents::from_decimal(unit_rate)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineItemLocation, ShipmentId, ShipmentStatus, TariffRate};
    use crate::rates::{RateTable, ReferenceData};
    use crate::unit::Pound;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn item(code: &str, discount_type: DiscountType, unit: MeasurementUnit) -> TariffItem {
        TariffItem {
            code: code.into(),
            description: code.into(),
            requires_pre_approval: false,
            discount_type,
            measurement_unit: unit,
        }
    }

    fn rate(code: &str, millicents: i64, miles: Option<(u32, u32)>) -> TariffRate {
        TariffRate {
            code: code.into(),
            effective_date_lower: date(2019, 5, 15),
            effective_date_upper: date(2020, 5, 15),
            weight_lbs_lower: 1000,
            weight_lbs_upper: 5000,
            distance_miles_lower: miles.map(|m| m.0),
            distance_miles_upper: miles.map(|m| m.1),
            rate_millicents: Millicents(millicents),
        }
    }

    fn calculator() -> CostCalculator {
        let table = RateTable::new(ReferenceData {
            tariff_items: vec![
                item("LHS", DiscountType::Linehaul, MeasurementUnit::WeightDistance),
                item("105A", DiscountType::Linehaul, MeasurementUnit::Weight),
                item("105B", DiscountType::Linehaul, MeasurementUnit::Volume),
                item("35A", DiscountType::NonDiscountable, MeasurementUnit::ActualCost),
            ],
            rates: vec![
                rate("LHS", 1_333, Some((1000, 1100))),
                rate("105A", 65_423, None),
                rate("105B", 5_555, None),
                rate("35A", 100_000, None),
            ],
            ..ReferenceData::default()
        })
        .unwrap();
        CostCalculator::new(Arc::new(table))
    }

    fn shipment() -> Shipment {
        Shipment {
            id: ShipmentId::new(),
            status: ShipmentStatus::Delivered,
            net_weight: Some(Pound(3000)),
            pickup_address: None,
            delivery_address: None,
            book_date: Some(date(2019, 6, 1)),
            requested_pickup_date: Some(date(2019, 6, 20)),
            actual_pickup_date: None,
            actual_delivery_date: None,
            traffic_distribution_grouping_id: None,
            carrier_performance_id: None,
            linehaul_charge: None,
        }
    }

    fn line_item(code: &str, q1: i64) -> LineItem {
        let mut li = LineItem::new(ShipmentId::new(), code, LineItemLocation::Origin, Utc::now());
        li.quantity_1 = BaseQuantity(q1);
        li
    }

    #[test]
    fn test_undiscounted_shipment_charge_is_exact() {
        // 30 cwt * 1044 mi * 1333 mc = 41_749_560 mc
        let charge = calculator()
            .compute_shipment_charge(&shipment(), 1044, DiscountRate::NONE)
            .unwrap();
        assert_eq!(charge.fee, Cents(41_750));
        assert_eq!(charge.rate, Millicents(1_333));
    }

    #[test]
    fn test_discount_applied_to_rate_and_fee() {
        let discount = DiscountRate::new(dec!(0.5)).unwrap();
        let charge = calculator()
            .compute_shipment_charge(&shipment(), 1044, discount)
            .unwrap();
        // 666.5 mc per unit, 20_874_780 mc total
        assert_eq!(charge.fee, Cents(20_875));
        assert_eq!(charge.rate, Millicents(667));
    }

    #[test]
    fn test_shipment_charge_outside_distance_band() {
        let err = calculator()
            .compute_shipment_charge(&shipment(), 900, DiscountRate::NONE)
            .unwrap_err();
        assert!(matches!(err, PricingError::NoApplicableRate { .. }));
    }

    #[test]
    fn test_weight_item_priced_per_cwt() {
        let discount = DiscountRate::new(dec!(0.45)).unwrap();
        let charge = calculator()
            .compute_line_item_charge(
                &line_item("105A", BaseQuantity::from_units(3000).0),
                &shipment(),
                discount,
            )
            .unwrap();
        // 65_423 * 0.45 = 29_440.35 mc per cwt, * 30 = 883_210.5 mc
        assert_eq!(charge.fee, Cents(883));
        assert_eq!(charge.rate, Millicents(29_440));
    }

    #[test]
    fn test_volume_item_uses_fractional_quantity() {
        let charge = calculator()
            .compute_line_item_charge(&line_item("105B", 474_000), &shipment(), DiscountRate::NONE)
            .unwrap();
        // 47.4 cu ft * 5555 mc = 263_307 mc
        assert_eq!(charge.fee, Cents(263));
    }

    #[test]
    fn test_actual_cost_item_never_discounted() {
        let mut li = line_item("35A", 0);
        li.estimate_amount_cents = Some(Cents(25_000));
        let discount = DiscountRate::new(dec!(0.5)).unwrap();
        let charge = calculator()
            .compute_line_item_charge(&li, &shipment(), discount)
            .unwrap();
        // $250 at 100_000 mc per dollar
        assert_eq!(charge.fee, Cents(25_000));
        assert_eq!(charge.rate, Millicents(100_000));

        li.actual_amount_cents = Some(Cents(30_000));
        let charge = calculator()
            .compute_line_item_charge(&li, &shipment(), discount)
            .unwrap();
        assert_eq!(charge.fee, Cents(30_000));
    }

    #[test]
    fn test_actual_cost_without_amounts_is_unpriceable() {
        let err = calculator()
            .compute_line_item_charge(&line_item("35A", 0), &shipment(), DiscountRate::NONE)
            .unwrap_err();
        assert!(err.validation_errors().is_some());
    }

    #[test]
    fn test_unknown_code_is_not_found() {
        let err = calculator()
            .compute_line_item_charge(&line_item("999Z", 10_000), &shipment(), DiscountRate::NONE)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_missing_weight_is_validation_error() {
        let mut s = shipment();
        s.net_weight = None;
        let err = calculator()
            .compute_shipment_charge(&s, 1044, DiscountRate::NONE)
            .unwrap_err();
        assert!(err.validation_errors().is_some());
    }
}
