use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::address::Address;
use super::ids::{GroupingId, PerformanceId, ShipmentId};
use crate::error::{PricingError, PricingResult};
use crate::unit::{FeeAndRate, Pound};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Draft,
    Submitted,
    Awarded,
    Accepted,
    Approved,
    InTransit,
    Delivered,
    Completed,
    Canceled,
}

impl ShipmentStatus {
    /// Delivered shipments (and those closed out after delivery) can be priced
    pub fn is_priceable(self) -> bool {
        matches!(self, Self::Delivered | Self::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Awarded => "AWARDED",
            Self::Accepted => "ACCEPTED",
            Self::Approved => "APPROVED",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Completed => "COMPLETED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub status: ShipmentStatus,
    #[serde(default)]
    pub net_weight: Option<Pound>,
    #[serde(default)]
    pub pickup_address: Option<Address>,
    #[serde(default)]
    pub delivery_address: Option<Address>,
    #[serde(default)]
    pub book_date: Option<NaiveDate>,
    #[serde(default)]
    pub requested_pickup_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_pickup_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub traffic_distribution_grouping_id: Option<GroupingId>,
    #[serde(default)]
    pub carrier_performance_id: Option<PerformanceId>,
    /// Linehaul charge from the last pricing run
    #[serde(default)]
    pub linehaul_charge: Option<FeeAndRate>,
}

impl Shipment {
    pub fn net_weight(&self) -> PricingResult<Pound> {
        self.net_weight
            .ok_or_else(|| PricingError::validation("net_weight", "is required for pricing"))
    }

    pub fn book_date(&self) -> PricingResult<NaiveDate> {
        self.book_date
            .ok_or_else(|| PricingError::validation("book_date", "is required for pricing"))
    }

    pub fn requested_pickup_date(&self) -> PricingResult<NaiveDate> {
        self.requested_pickup_date.ok_or_else(|| {
            PricingError::validation("requested_pickup_date", "is required for carrier selection")
        })
    }

    pub fn pickup_address(&self) -> PricingResult<&Address> {
        self.pickup_address
            .as_ref()
            .ok_or_else(|| PricingError::validation("pickup_address", "is required"))
    }

    pub fn delivery_address(&self) -> PricingResult<&Address> {
        self.delivery_address
            .as_ref()
            .ok_or_else(|| PricingError::validation("delivery_address", "is required"))
    }

    /// Record delivery. Only a shipment in transit can be delivered.
    pub fn deliver(&mut self, delivery_date: NaiveDate) -> PricingResult<()> {
        if self.status != ShipmentStatus::InTransit {
            return Err(PricingError::invalid_transition(self.status, "deliver"));
        }
        self.status = ShipmentStatus::Delivered;
        self.actual_delivery_date = Some(delivery_date);
        Ok(())
    }
}
