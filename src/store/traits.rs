//! Core trait definitions for the record store

use async_trait::async_trait;

use super::error::StoreResult;
use crate::models::{
    Address, AddressId, CarrierPerformance, Dimensions, DimensionsId,
    GroupingId, GroupingKey, LineItem, LineItemId, PerformanceCandidate, PerformanceId, Shipment,
    ShipmentId, SitId, StorageInTransit, TrafficDistributionGrouping,
};

/// Entry point to the store: every unit of work happens inside a transaction
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Begin a transaction. Dropping it without `commit` discards its writes.
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>>;
}

/// Request-scoped transaction over the pricing records
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn shipment(&self, id: &ShipmentId) -> StoreResult<Option<Shipment>>;

    async fn save_shipment(&mut self, shipment: &Shipment) -> StoreResult<()>;

    /// Line items of a shipment, oldest first
    async fn line_items_for_shipment(&self, shipment_id: &ShipmentId)
        -> StoreResult<Vec<LineItem>>;

    async fn line_item(&self, id: &LineItemId) -> StoreResult<Option<LineItem>>;

    async fn save_line_item(&mut self, item: &LineItem) -> StoreResult<()>;

    async fn delete_line_item(&mut self, id: &LineItemId) -> StoreResult<()>;

    async fn dimensions(&self, id: &DimensionsId) -> StoreResult<Option<Dimensions>>;

    async fn save_dimensions(&mut self, dimensions: &Dimensions) -> StoreResult<()>;

    async fn delete_dimensions(&mut self, id: &DimensionsId) -> StoreResult<()>;

    async fn address(&self, id: &AddressId) -> StoreResult<Option<Address>>;

    async fn save_address(&mut self, address: &Address) -> StoreResult<()>;

    async fn delete_address(&mut self, id: &AddressId) -> StoreResult<()>;

    /// SIT records of a shipment, oldest first
    async fn sits_for_shipment(&self, shipment_id: &ShipmentId)
        -> StoreResult<Vec<StorageInTransit>>;

    async fn sit(&self, id: &SitId) -> StoreResult<Option<StorageInTransit>>;

    async fn save_sit(&mut self, sit: &StorageInTransit) -> StoreResult<()>;

    async fn delete_sit(&mut self, id: &SitId) -> StoreResult<()>;

    async fn carrier_performance(&self, id: &PerformanceId)
        -> StoreResult<Option<CarrierPerformance>>;

    /// Every performance row of a grouping joined with its carrier
    async fn performances_for_grouping(
        &self,
        grouping_id: &GroupingId,
    ) -> StoreResult<Vec<PerformanceCandidate>>;

    async fn grouping_by_key(
        &self,
        key: &GroupingKey,
    ) -> StoreResult<Option<TrafficDistributionGrouping>>;

    /// Insert a new grouping. Fails with `StoreError::Conflict` when the key
    /// is already taken.
    async fn insert_grouping(&mut self, grouping: &TrafficDistributionGrouping) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
