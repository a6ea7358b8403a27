//! Tariff reference data: accessorial items and their rates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::line_item::LineItemLocation;
use crate::unit::{Millicents, Pound};

/// Third-party service billed at actual cost. The only item allowed to move
/// back and forth between the two approved statuses.
pub const ACTUAL_COST_CODE: &str = "35A";

/// SIT first day and warehouse
pub const SIT_FIRST_DAY_CODE: &str = "185A";
/// SIT each additional day
pub const SIT_ADDITIONAL_DAYS_CODE: &str = "185B";

/// How a tariff item's discount is chosen. Configured per item in the
/// reference data; never derived from the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// Carrier's linehaul discount
    Linehaul,
    /// Carrier's discount, applied to storage charges
    Sit,
    NonDiscountable,
}

/// What a rate is charged per
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementUnit {
    /// Per hundredweight; `quantity_1` holds pounds
    Weight,
    /// Per hundredweight-mile; `quantity_1` pounds, `quantity_2` miles.
    /// Rates may be banded by distance.
    WeightDistance,
    /// Per cubic foot in `quantity_1`
    Volume,
    /// Per item counted in `quantity_1`
    Each,
    /// Per mile in `quantity_1`, banded by distance
    Distance,
    /// Per hundredweight-day; `quantity_1` pounds, `quantity_2` days
    Days,
    Flat,
    /// Per dollar of the actual (or estimated) vendor cost
    ActualCost,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffItem {
    pub code: String,
    pub description: String,
    pub requires_pre_approval: bool,
    pub discount_type: DiscountType,
    pub measurement_unit: MeasurementUnit,
}

impl TariffItem {
    pub fn is_actual_cost(&self) -> bool {
        self.code == ACTUAL_COST_CODE
    }
}

/// One row of the rate table. Ranges are lower-inclusive, upper-exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffRate {
    pub code: String,
    pub effective_date_lower: NaiveDate,
    pub effective_date_upper: NaiveDate,
    pub weight_lbs_lower: i64,
    pub weight_lbs_upper: i64,
    #[serde(default)]
    pub distance_miles_lower: Option<u32>,
    #[serde(default)]
    pub distance_miles_upper: Option<u32>,
    pub rate_millicents: Millicents,
}

impl TariffRate {
    pub fn applies(&self, code: &str, weight: Pound, date: NaiveDate, miles: Option<u32>) -> bool {
        if self.code != code {
            return false;
        }
        if date < self.effective_date_lower || date >= self.effective_date_upper {
            return false;
        }
        if weight.0 < self.weight_lbs_lower || weight.0 >= self.weight_lbs_upper {
            return false;
        }
        match (self.distance_miles_lower, self.distance_miles_upper) {
            (None, None) => true,
            (lower, upper) => match miles {
                None => false,
                Some(m) => lower.map_or(true, |l| m >= l) && upper.map_or(true, |u| m < u),
            },
        }
    }
}

/// Line items every priced shipment carries exactly once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BaseCategory {
    Linehaul,
    OriginServiceCharge,
    DestinationServiceCharge,
    Pack,
    Unpack,
    FuelSurcharge,
}

impl BaseCategory {
    pub const ALL: [BaseCategory; 6] = [
        BaseCategory::Linehaul,
        BaseCategory::OriginServiceCharge,
        BaseCategory::DestinationServiceCharge,
        BaseCategory::Pack,
        BaseCategory::Unpack,
        BaseCategory::FuelSurcharge,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Self::Linehaul => "LHS",
            Self::OriginServiceCharge => "135A",
            Self::DestinationServiceCharge => "135B",
            Self::Pack => "105A",
            Self::Unpack => "105C",
            Self::FuelSurcharge => "16A",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Position in [`BaseCategory::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn location(self) -> LineItemLocation {
        match self {
            Self::DestinationServiceCharge | Self::Unpack => LineItemLocation::Destination,
            Self::OriginServiceCharge | Self::Pack => LineItemLocation::Origin,
            Self::Linehaul | Self::FuelSurcharge => LineItemLocation::Neither,
        }
    }
}

impl fmt::Display for BaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
