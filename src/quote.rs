//! Ad-hoc pricing of the base charges for a hypothetical shipment, used to
//! check reference data before it is loaded for real shipments

use chrono::{NaiveDate, Utc};
use serde::Serialize;

use crate::error::PricingResult;
use crate::models::{
    Address, AddressId, BaseCategory, LineItem, Shipment, ShipmentId, ShipmentStatus,
};
use crate::pricing::CostCalculator;
use crate::unit::{BaseQuantity, Cents, DiscountRate, FeeAndRate, Pound};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub origin_zip: String,
    pub destination_zip: String,
    pub weight: Pound,
    pub book_date: NaiveDate,
    pub pickup_date: NaiveDate,
    pub miles: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotedCharge {
    pub category: BaseCategory,
    pub code: String,
    pub charge: FeeAndRate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub discount: DiscountRate,
    pub shipment_charge: FeeAndRate,
    pub charges: Vec<QuotedCharge>,
    pub total: Cents,
}

impl QuoteRequest {
    /// Delivered shipment carrying the request's facts, with no stored
    /// identity behind it
    pub fn shipment(&self) -> Shipment {
        Shipment {
            id: ShipmentId::new(),
            status: ShipmentStatus::Delivered,
            net_weight: Some(self.weight),
            pickup_address: Some(zip_only(&self.origin_zip)),
            delivery_address: Some(zip_only(&self.destination_zip)),
            book_date: Some(self.book_date),
            requested_pickup_date: Some(self.pickup_date),
            actual_pickup_date: None,
            actual_delivery_date: None,
            traffic_distribution_grouping_id: None,
            carrier_performance_id: None,
            linehaul_charge: None,
        }
    }
}

fn zip_only(postal_code: &str) -> Address {
    Address {
        id: AddressId::new(),
        street_address_1: String::new(),
        street_address_2: None,
        city: String::new(),
        state: String::new(),
        postal_code: postal_code.to_string(),
    }
}

/// Price the shipment linehaul and every base category. Fails on the first
/// charge the reference data cannot price.
pub fn quote_base_charges(
    calculator: &CostCalculator,
    request: &QuoteRequest,
    discount: DiscountRate,
) -> PricingResult<Quote> {
    let shipment = request.shipment();
    let shipment_charge = calculator.compute_shipment_charge(&shipment, request.miles, discount)?;

    let now = Utc::now();
    let mut charges = Vec::with_capacity(BaseCategory::ALL.len());
    for category in BaseCategory::ALL {
        let mut item = LineItem::base(shipment.id, category, now);
        item.quantity_1 = BaseQuantity::from_units(request.weight.0);
        if matches!(category, BaseCategory::Linehaul | BaseCategory::FuelSurcharge) {
            item.quantity_2 = BaseQuantity::from_units(i64::from(request.miles));
        }
        let charge = calculator.compute_line_item_charge(&item, &shipment, discount)?;
        charges.push(QuotedCharge {
            category,
            code: category.code().to_string(),
            charge,
        });
    }

    let total = Cents(charges.iter().map(|c| c.charge.fee.0).sum());
    Ok(Quote {
        discount,
        shipment_charge,
        charges,
        total,
    })
}
