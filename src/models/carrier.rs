use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{CarrierId, GroupingId, PerformanceId};
use crate::unit::DiscountRate;

/// Transportation service provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub name: String,
    pub enrolled: bool,
}

/// A carrier's standing within one traffic distribution grouping for one
/// performance period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierPerformance {
    pub id: PerformanceId,
    pub grouping_id: GroupingId,
    pub carrier_id: CarrierId,
    pub linehaul_rate: DiscountRate,
    pub offer_count: u32,
    pub best_value_score: Decimal,
    pub performance_period_start: NaiveDate,
    pub performance_period_end: NaiveDate,
    pub rate_cycle_start: NaiveDate,
    pub rate_cycle_end: NaiveDate,
}

impl CarrierPerformance {
    /// Both windows are inclusive at each end
    pub fn covers(&self, book_date: NaiveDate, pickup_date: NaiveDate) -> bool {
        (self.performance_period_start..=self.performance_period_end).contains(&book_date)
            && (self.rate_cycle_start..=self.rate_cycle_end).contains(&pickup_date)
    }
}

/// A performance row together with its carrier's enrollment flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceCandidate {
    pub performance: CarrierPerformance,
    pub carrier_enrolled: bool,
}

/// Key a grouping is unique on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupingKey {
    pub source_rate_area: String,
    pub destination_region: String,
    pub code_of_service: String,
}

impl fmt::Display for GroupingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.source_rate_area, self.destination_region, self.code_of_service
        )
    }
}

/// Traffic distribution grouping (origin rate area, destination region,
/// code of service)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficDistributionGrouping {
    pub id: GroupingId,
    #[serde(flatten)]
    pub key: GroupingKey,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_covers_inclusive_windows() {
        let p = CarrierPerformance {
            id: PerformanceId::new(),
            grouping_id: GroupingId::new(),
            carrier_id: CarrierId::new(),
            linehaul_rate: DiscountRate::new(dec!(0.5)).unwrap(),
            offer_count: 0,
            best_value_score: dec!(90),
            performance_period_start: date(2019, 5, 15),
            performance_period_end: date(2019, 7, 31),
            rate_cycle_start: date(2019, 5, 15),
            rate_cycle_end: date(2019, 9, 30),
        };
        assert!(p.covers(date(2019, 5, 15), date(2019, 9, 30)));
        assert!(p.covers(date(2019, 6, 1), date(2019, 6, 20)));
        assert!(!p.covers(date(2019, 8, 1), date(2019, 6, 20)));
        assert!(!p.covers(date(2019, 6, 1), date(2019, 10, 1)));
    }
}
