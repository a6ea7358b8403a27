//! Common test fixtures: reference tables, a delivered shipment with its
//! carrier performances, and wired-up services over a memory store

#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

use hhg_pricing::carrier::CarrierSelector;
use hhg_pricing::dataset::Dataset;
use hhg_pricing::models::{
    Address, AddressId, Carrier, CarrierId, CarrierPerformance, DiscountType, GroupingId,
    GroupingKey, MeasurementUnit, PerformanceId, Shipment, ShipmentId, ShipmentStatus, SitId,
    SitLocation, SitStatus, StorageInTransit, TariffItem, TariffRate, TrafficDistributionGrouping,
};
use hhg_pricing::pricing::CostCalculator;
use hhg_pricing::rates::{RateLookup, RateTable, ReferenceData};
use hhg_pricing::routing::FixedDistancePlanner;
use hhg_pricing::services::{LineItemService, Recalculator, SitService};
use hhg_pricing::store::{MemoryStore, Records};
use hhg_pricing::unit::{DiscountRate, Millicents, Pound};

pub const ORIGIN_ZIP: &str = "62225";
pub const DESTINATION_ZIP: &str = "85004";
pub const WEIGHT_LBS: i64 = 3000;
pub const MILES: u32 = 1000;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn book_date() -> NaiveDate {
    date(2019, 6, 1)
}

pub fn pickup_date() -> NaiveDate {
    date(2019, 6, 20)
}

fn tariff(
    code: &str,
    pre_approval: bool,
    discount_type: DiscountType,
    measurement_unit: MeasurementUnit,
) -> TariffItem {
    TariffItem {
        code: code.into(),
        description: format!("Tariff item {code}"),
        requires_pre_approval: pre_approval,
        discount_type,
        measurement_unit,
    }
}

fn rate(code: &str, millicents: i64) -> TariffRate {
    TariffRate {
        code: code.into(),
        effective_date_lower: date(2019, 5, 15),
        effective_date_upper: date(2020, 5, 15),
        weight_lbs_lower: 0,
        weight_lbs_upper: 100_000,
        distance_miles_lower: None,
        distance_miles_upper: None,
        rate_millicents: Millicents(millicents),
    }
}

fn banded(code: &str, lower: u32, upper: u32, millicents: i64) -> TariffRate {
    TariffRate {
        distance_miles_lower: Some(lower),
        distance_miles_upper: Some(upper),
        ..rate(code, millicents)
    }
}

/// At 3,000 lb and 1,000 miles with the fixture's 0.5 discount:
/// LHS $15.00, 135A $0.75, 135B $0.90, 105A $1.05, 105C $0.12, 16A $0.90
pub fn reference_data() -> ReferenceData {
    use DiscountType::*;
    use MeasurementUnit::*;

    ReferenceData {
        tariff_items: vec![
            tariff("LHS", false, Linehaul, WeightDistance),
            tariff("135A", false, Linehaul, Weight),
            tariff("135B", false, Linehaul, Weight),
            tariff("105A", false, Linehaul, Weight),
            tariff("105C", false, Linehaul, Weight),
            tariff("16A", false, NonDiscountable, WeightDistance),
            tariff("105B", true, Linehaul, Volume),
            tariff("4A", true, Linehaul, Each),
            tariff("35A", true, NonDiscountable, ActualCost),
            tariff("185A", false, Sit, Weight),
            tariff("185B", false, Sit, Days),
        ],
        rates: vec![
            banded("LHS", 0, 800, 120),
            banded("LHS", 800, 5000, 100),
            rate("135A", 5000),
            rate("135B", 6000),
            rate("105A", 7000),
            rate("105C", 800),
            rate("16A", 3),
            rate("105B", 2500),
            rate("4A", 10_000),
            rate("35A", 100_000),
            rate("185A", 2000),
            rate("185B", 100),
        ],
        rate_areas: [(ORIGIN_ZIP.to_string(), "US62".to_string())].into(),
        regions: [("850".to_string(), "11".to_string())].into(),
    }
}

pub fn grouping_key() -> GroupingKey {
    GroupingKey {
        source_rate_area: "US62".into(),
        destination_region: "11".into(),
        code_of_service: "D".into(),
    }
}

pub fn address(postal_code: &str) -> Address {
    Address {
        id: AddressId::new(),
        street_address_1: "123 Any St".into(),
        street_address_2: None,
        city: "Anytown".into(),
        state: "IL".into(),
        postal_code: postal_code.into(),
    }
}

pub fn shipment(status: ShipmentStatus) -> Shipment {
    Shipment {
        id: ShipmentId::new(),
        status,
        net_weight: Some(Pound(WEIGHT_LBS)),
        pickup_address: Some(address(ORIGIN_ZIP)),
        delivery_address: Some(address(DESTINATION_ZIP)),
        book_date: Some(book_date()),
        requested_pickup_date: Some(pickup_date()),
        actual_pickup_date: Some(pickup_date()),
        actual_delivery_date: None,
        traffic_distribution_grouping_id: None,
        carrier_performance_id: None,
        linehaul_charge: None,
    }
}

pub fn performance(
    grouping_id: GroupingId,
    carrier_id: CarrierId,
    offers: u32,
    score: rust_decimal::Decimal,
    discount: rust_decimal::Decimal,
) -> CarrierPerformance {
    CarrierPerformance {
        id: PerformanceId::new(),
        grouping_id,
        carrier_id,
        linehaul_rate: DiscountRate::new(discount).unwrap(),
        offer_count: offers,
        best_value_score: score,
        performance_period_start: date(2019, 5, 15),
        performance_period_end: date(2019, 7, 31),
        rate_cycle_start: date(2019, 5, 15),
        rate_cycle_end: date(2019, 9, 30),
    }
}

pub fn sit(shipment_id: ShipmentId, location: SitLocation, status: SitStatus) -> StorageInTransit {
    StorageInTransit {
        id: SitId::new(),
        shipment_id,
        sit_number: None,
        status,
        location,
        estimated_start_date: date(2019, 6, 21),
        authorized_start_date: None,
        actual_start_date: None,
        out_date: None,
        notes: None,
        authorization_notes: None,
        warehouse_id: "WH-1".into(),
        warehouse_name: "Desert Storage".into(),
        warehouse_address_id: AddressId::new(),
        warehouse_phone: None,
        warehouse_email: None,
        created_at: Utc::now(),
    }
}

/// Seeded records plus the handles tests assert against
pub struct Fixture {
    pub records: Records,
    pub shipment_id: ShipmentId,
    pub grouping_id: GroupingId,
    /// Fewest offers among enrolled carriers; the expected award
    pub best: PerformanceId,
    pub busier: PerformanceId,
    pub unenrolled: PerformanceId,
}

/// A delivered 3,000 lb shipment from US62 to region 11 with three
/// performances in its grouping
pub fn fixture_with(status: ShipmentStatus) -> Fixture {
    let grouping = TrafficDistributionGrouping {
        id: GroupingId::new(),
        key: grouping_key(),
    };
    let enrolled = Carrier {
        id: CarrierId::new(),
        name: "Enrolled Movers".into(),
        enrolled: true,
    };
    let dropped = Carrier {
        id: CarrierId::new(),
        name: "Dropped Movers".into(),
        enrolled: false,
    };

    let best = performance(grouping.id, enrolled.id, 0, dec!(90), dec!(0.5));
    let busier = performance(grouping.id, enrolled.id, 1, dec!(99), dec!(0.4));
    let unenrolled = performance(grouping.id, dropped.id, 0, dec!(95), dec!(0.3));

    let shipment = shipment(status);
    Fixture {
        shipment_id: shipment.id,
        grouping_id: grouping.id,
        best: best.id,
        busier: busier.id,
        unenrolled: unenrolled.id,
        records: Records {
            shipments: vec![shipment],
            carriers: vec![enrolled, dropped],
            carrier_performances: vec![best, busier, unenrolled],
            traffic_distribution_groupings: vec![grouping],
            ..Records::default()
        },
    }
}

pub fn fixture() -> Fixture {
    fixture_with(ShipmentStatus::Delivered)
}

impl Fixture {
    /// Link the shipment to the performance it would be awarded
    pub fn linked(mut self) -> Self {
        for shipment in &mut self.records.shipments {
            shipment.traffic_distribution_grouping_id = Some(self.grouping_id);
            shipment.carrier_performance_id = Some(self.best);
        }
        self
    }

    pub fn dataset(&self) -> Dataset {
        Dataset {
            reference: reference_data(),
            records: self.records.clone(),
        }
    }
}

/// Services sharing one store and one set of reference tables
pub struct Engine {
    pub store: Arc<MemoryStore>,
    pub rates: Arc<dyn RateLookup>,
    pub line_items: LineItemService,
    pub sits: SitService,
    pub recalculator: Recalculator,
}

impl Engine {
    pub fn new(records: Records) -> Self {
        Self::with_planner(records, Arc::new(FixedDistancePlanner::new(MILES)))
    }

    pub fn with_planner(
        records: Records,
        planner: Arc<dyn hhg_pricing::routing::DistancePlanner>,
    ) -> Self {
        let rates: Arc<dyn RateLookup> = Arc::new(RateTable::new(reference_data()).unwrap());
        let store = Arc::new(MemoryStore::from_records(records).unwrap());
        let calculator = CostCalculator::new(rates.clone());
        Self {
            line_items: LineItemService::new(store.clone(), calculator.clone()),
            sits: SitService::new(store.clone()),
            recalculator: Recalculator::new(
                store.clone(),
                calculator,
                CarrierSelector::new(rates.clone()),
                planner,
                Duration::from_secs(2),
            ),
            store,
            rates,
        }
    }
}
