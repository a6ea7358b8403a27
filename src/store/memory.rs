//! In-memory record store

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::traits::{RecordStore, Transaction};
use crate::models::{
    Address, AddressId, Carrier, CarrierId, CarrierPerformance, Dimensions, DimensionsId,
    GroupingId, GroupingKey, LineItem, LineItemId, PerformanceCandidate, PerformanceId, Shipment,
    ShipmentId, SitId, StorageInTransit, TrafficDistributionGrouping,
};

/// Flat record lists, the shape datasets are loaded from and dumped to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Records {
    #[serde(default)]
    pub shipments: Vec<Shipment>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub dimensions: Vec<Dimensions>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub storage_in_transits: Vec<StorageInTransit>,
    #[serde(default)]
    pub carriers: Vec<Carrier>,
    #[serde(default)]
    pub carrier_performances: Vec<CarrierPerformance>,
    #[serde(default)]
    pub traffic_distribution_groupings: Vec<TrafficDistributionGrouping>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    shipments: HashMap<ShipmentId, Shipment>,
    line_items: HashMap<LineItemId, LineItem>,
    dimensions: HashMap<DimensionsId, Dimensions>,
    addresses: HashMap<AddressId, Address>,
    sits: HashMap<SitId, StorageInTransit>,
    carriers: HashMap<CarrierId, Carrier>,
    performances: HashMap<PerformanceId, CarrierPerformance>,
    groupings: HashMap<GroupingId, TrafficDistributionGrouping>,
    grouping_keys: HashMap<GroupingKey, GroupingId>,
}

impl Tables {
    fn insert_grouping(&mut self, grouping: &TrafficDistributionGrouping) -> StoreResult<()> {
        if self.grouping_keys.contains_key(&grouping.key) {
            return Err(StoreError::conflict(format!(
                "traffic distribution grouping {} already exists",
                grouping.key
            )));
        }
        self.grouping_keys.insert(grouping.key.clone(), grouping.id);
        self.groupings.insert(grouping.id, grouping.clone());
        Ok(())
    }
}

/// Store backed by process memory. Transactions are serialized: a
/// transaction holds the store lock until it is committed or dropped.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store. Duplicate grouping keys are rejected.
    pub fn from_records(records: Records) -> StoreResult<Self> {
        let mut tables = Tables::default();
        for grouping in &records.traffic_distribution_groupings {
            tables.insert_grouping(grouping)?;
        }
        tables.shipments = by_id(records.shipments, |s| s.id);
        tables.line_items = by_id(records.line_items, |li| li.id);
        tables.dimensions = by_id(records.dimensions, |d| d.id);
        tables.addresses = by_id(records.addresses, |a| a.id);
        tables.sits = by_id(records.storage_in_transits, |s| s.id);
        tables.carriers = by_id(records.carriers, |c| c.id);
        tables.performances = by_id(records.carrier_performances, |p| p.id);

        debug!(
            shipments = tables.shipments.len(),
            line_items = tables.line_items.len(),
            performances = tables.performances.len(),
            "Seeded memory store"
        );

        Ok(Self {
            tables: Arc::new(Mutex::new(tables)),
        })
    }

    /// Copy of everything currently committed
    pub async fn snapshot(&self) -> Records {
        let tables = self.tables.lock().await;
        Records {
            shipments: sorted(tables.shipments.values(), |s| s.id),
            line_items: sorted(tables.line_items.values(), |li| (li.created_at, li.id)),
            dimensions: sorted(tables.dimensions.values(), |d| d.id),
            addresses: sorted(tables.addresses.values(), |a| a.id),
            storage_in_transits: sorted(tables.sits.values(), |s| (s.created_at, s.id)),
            carriers: sorted(tables.carriers.values(), |c| c.id),
            carrier_performances: sorted(tables.performances.values(), |p| p.id),
            traffic_distribution_groupings: sorted(tables.groupings.values(), |g| g.id),
        }
    }
}

fn by_id<K, V>(records: Vec<V>, key: impl Fn(&V) -> K) -> HashMap<K, V>
where
    K: std::hash::Hash + Eq,
{
    records.into_iter().map(|r| (key(&r), r)).collect()
}

fn sorted<'a, V, K>(values: impl Iterator<Item = &'a V>, key: impl Fn(&V) -> K) -> Vec<V>
where
    V: Clone + 'a,
    K: Ord,
{
    let mut out: Vec<V> = values.cloned().collect();
    out.sort_by_key(|v| key(v));
    out
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, staged }))
    }
}

/// Works on a staged copy of the tables; commit swaps it in
struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

fn remove<K, V>(map: &mut HashMap<K, V>, id: &K, entity: &str) -> StoreResult<()>
where
    K: std::hash::Hash + Eq + std::fmt::Display,
{
    map.remove(id)
        .map(|_| ())
        .ok_or_else(|| StoreError::not_found(format!("{entity} {id}")))
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn shipment(&self, id: &ShipmentId) -> StoreResult<Option<Shipment>> {
        Ok(self.staged.shipments.get(id).cloned())
    }

    async fn save_shipment(&mut self, shipment: &Shipment) -> StoreResult<()> {
        self.staged.shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn line_items_for_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> StoreResult<Vec<LineItem>> {
        Ok(sorted(
            self.staged
                .line_items
                .values()
                .filter(|li| li.shipment_id == *shipment_id),
            |li| (li.created_at, li.id),
        ))
    }

    async fn line_item(&self, id: &LineItemId) -> StoreResult<Option<LineItem>> {
        Ok(self.staged.line_items.get(id).cloned())
    }

    async fn save_line_item(&mut self, item: &LineItem) -> StoreResult<()> {
        self.staged.line_items.insert(item.id, item.clone());
        Ok(())
    }

    async fn delete_line_item(&mut self, id: &LineItemId) -> StoreResult<()> {
        remove(&mut self.staged.line_items, id, "line item")
    }

    async fn dimensions(&self, id: &DimensionsId) -> StoreResult<Option<Dimensions>> {
        Ok(self.staged.dimensions.get(id).copied())
    }

    async fn save_dimensions(&mut self, dimensions: &Dimensions) -> StoreResult<()> {
        self.staged.dimensions.insert(dimensions.id, *dimensions);
        Ok(())
    }

    async fn delete_dimensions(&mut self, id: &DimensionsId) -> StoreResult<()> {
        remove(&mut self.staged.dimensions, id, "dimensions")
    }

    async fn address(&self, id: &AddressId) -> StoreResult<Option<Address>> {
        Ok(self.staged.addresses.get(id).cloned())
    }

    async fn save_address(&mut self, address: &Address) -> StoreResult<()> {
        self.staged.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn delete_address(&mut self, id: &AddressId) -> StoreResult<()> {
        remove(&mut self.staged.addresses, id, "address")
    }

    async fn sits_for_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> StoreResult<Vec<StorageInTransit>> {
        Ok(sorted(
            self.staged
                .sits
                .values()
                .filter(|s| s.shipment_id == *shipment_id),
            |s| (s.created_at, s.id),
        ))
    }

    async fn sit(&self, id: &SitId) -> StoreResult<Option<StorageInTransit>> {
        Ok(self.staged.sits.get(id).cloned())
    }

    async fn save_sit(&mut self, sit: &StorageInTransit) -> StoreResult<()> {
        self.staged.sits.insert(sit.id, sit.clone());
        Ok(())
    }

    async fn delete_sit(&mut self, id: &SitId) -> StoreResult<()> {
        remove(&mut self.staged.sits, id, "storage in transit")
    }

    async fn carrier_performance(
        &self,
        id: &PerformanceId,
    ) -> StoreResult<Option<CarrierPerformance>> {
        Ok(self.staged.performances.get(id).cloned())
    }

    async fn performances_for_grouping(
        &self,
        grouping_id: &GroupingId,
    ) -> StoreResult<Vec<PerformanceCandidate>> {
        let candidates = self
            .staged
            .performances
            .values()
            .filter(|p| p.grouping_id == *grouping_id)
            .map(|p| PerformanceCandidate {
                performance: p.clone(),
                carrier_enrolled: self
                    .staged
                    .carriers
                    .get(&p.carrier_id)
                    .is_some_and(|c| c.enrolled),
            })
            .collect();
        Ok(candidates)
    }

    async fn grouping_by_key(
        &self,
        key: &GroupingKey,
    ) -> StoreResult<Option<TrafficDistributionGrouping>> {
        Ok(self
            .staged
            .grouping_keys
            .get(key)
            .and_then(|id| self.staged.groupings.get(id))
            .cloned())
    }

    async fn insert_grouping(&mut self, grouping: &TrafficDistributionGrouping) -> StoreResult<()> {
        self.staged.insert_grouping(grouping)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
