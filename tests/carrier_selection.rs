//! Grouping derivation and carrier performance selection through the store

mod common;

use common::{book_date, date, fixture, grouping_key, pickup_date, reference_data};
use hhg_pricing::carrier::{derive_grouping_key, fetch_or_create_grouping, CarrierSelector};
use hhg_pricing::models::{GroupingId, GroupingKey, TrafficDistributionGrouping};
use hhg_pricing::rates::{RateLookup, RateTable};
use hhg_pricing::store::{MemoryStore, RecordStore, Transaction};
use std::sync::Arc;

fn selector() -> CarrierSelector {
    let rates: Arc<dyn RateLookup> = Arc::new(RateTable::new(reference_data()).unwrap());
    CarrierSelector::new(rates)
}

#[tokio::test]
async fn test_selects_fewest_offers_among_enrolled() {
    let fx = fixture();
    let store = MemoryStore::from_records(fx.records.clone()).unwrap();
    let tx = store.begin().await.unwrap();

    let selected = selector()
        .select_carrier_performance(tx.as_ref(), &grouping_key(), book_date(), pickup_date())
        .await
        .unwrap();
    assert_eq!(selected.id, fx.best);
    assert_ne!(selected.id, fx.unenrolled);
}

#[tokio::test]
async fn test_unknown_grouping_is_not_found() {
    let fx = fixture();
    let store = MemoryStore::from_records(fx.records.clone()).unwrap();
    let tx = store.begin().await.unwrap();

    let key = GroupingKey {
        code_of_service: "2".into(),
        ..grouping_key()
    };
    let err = selector()
        .select_carrier_performance(tx.as_ref(), &key, book_date(), pickup_date())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_dates_outside_windows_are_not_found() {
    let fx = fixture();
    let store = MemoryStore::from_records(fx.records.clone()).unwrap();
    let tx = store.begin().await.unwrap();

    let err = selector()
        .select_carrier_performance(tx.as_ref(), &grouping_key(), date(2019, 8, 1), pickup_date())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = selector()
        .select_carrier_performance(tx.as_ref(), &grouping_key(), book_date(), date(2019, 10, 1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_derive_grouping_key_from_zips() {
    let rates = RateTable::new(reference_data()).unwrap();
    let key = derive_grouping_key(&rates, "62225-1234", "85004", "D").unwrap();
    assert_eq!(key, grouping_key());

    let err = derive_grouping_key(&rates, "10001", "85004", "D").unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_fetch_or_create_grouping_is_idempotent() {
    let store = MemoryStore::new();
    let key = GroupingKey {
        source_rate_area: "US10".into(),
        destination_region: "4".into(),
        code_of_service: "D".into(),
    };

    let mut tx = store.begin().await.unwrap();
    let created = fetch_or_create_grouping(tx.as_mut(), &key).await.unwrap();
    tx.commit().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    let fetched = fetch_or_create_grouping(tx.as_mut(), &key).await.unwrap();
    assert_eq!(fetched.id, created.id);

    let duplicate = TrafficDistributionGrouping {
        id: GroupingId::new(),
        key: key.clone(),
    };
    let err = tx.insert_grouping(&duplicate).await.unwrap_err();
    assert!(err.is_conflict());
    drop(tx);

    assert_eq!(store.snapshot().await.traffic_distribution_groupings.len(), 1);
}

#[tokio::test]
async fn test_assign_carrier_links_shipment() {
    let fx = fixture();
    let store = MemoryStore::from_records(fx.records.clone()).unwrap();
    let mut tx = store.begin().await.unwrap();
    let mut shipment = tx.shipment(&fx.shipment_id).await.unwrap().unwrap();

    let performance = selector()
        .assign_carrier(tx.as_mut(), &mut shipment)
        .await
        .unwrap();

    assert_eq!(performance.id, fx.best);
    assert_eq!(shipment.carrier_performance_id, Some(fx.best));
    assert_eq!(shipment.traffic_distribution_grouping_id, Some(fx.grouping_id));
}
