//! Storage in transit persistence and status changes

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use crate::error::{PricingError, PricingResult, ValidationErrors};
use crate::models::{Address, SitId, StorageInTransit};
use crate::store::{RecordStore, Transaction};

#[derive(Clone)]
pub struct SitService {
    store: Arc<dyn RecordStore>,
}

impl SitService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Save a SIT record together with its warehouse address. Validation
    /// problems in either record are reported together and nothing is
    /// written unless both are valid.
    ///
    /// New records are saved as requests. An existing record keeps its
    /// status and dates, which only the status actions below may change.
    pub async fn save_sit_with_address(
        &self,
        mut sit: StorageInTransit,
        warehouse_address: Address,
    ) -> PricingResult<StorageInTransit> {
        let mut tx = self.store.begin().await?;

        match tx.sit(&sit.id).await? {
            Some(stored) => sit.ensure_lifecycle_unchanged(&stored)?,
            None => sit.reset_lifecycle(),
        }

        let mut errors = ValidationErrors::new();
        errors.append_prefixed("warehouse_address", warehouse_address.validate());
        sit.warehouse_address_id = warehouse_address.id;
        errors.append(sit.validate());
        if tx.shipment(&sit.shipment_id).await?.is_none() {
            errors.add("shipment_id", format!("shipment {} does not exist", sit.shipment_id));
        }
        errors.into_result()?;

        tx.save_address(&warehouse_address).await?;
        tx.save_sit(&sit).await?;
        tx.commit().await?;

        info!(sit_id = %sit.id, status = %sit.status, "Saved storage in transit");
        Ok(sit)
    }

    /// Remove a SIT record that never held goods
    pub async fn delete_sit(&self, id: &SitId) -> PricingResult<StorageInTransit> {
        let mut tx = self.store.begin().await?;
        let sit = load_sit(tx.as_ref(), id).await?;
        if !sit.is_removable() {
            return Err(PricingError::forbidden(format!(
                "storage in transit {} is {} and cannot be deleted",
                sit.id, sit.status
            )));
        }
        tx.delete_sit(&sit.id).await?;
        tx.commit().await?;

        info!(sit_id = %sit.id, "Deleted storage in transit");
        Ok(sit)
    }

    pub async fn approve(
        &self,
        id: &SitId,
        authorized_start_date: NaiveDate,
        authorization_notes: Option<String>,
    ) -> PricingResult<StorageInTransit> {
        self.transition(id, |sit| sit.approve(authorized_start_date, authorization_notes))
            .await
    }

    pub async fn deny(
        &self,
        id: &SitId,
        authorization_notes: Option<String>,
    ) -> PricingResult<StorageInTransit> {
        self.transition(id, |sit| sit.deny(authorization_notes)).await
    }

    pub async fn place_into_sit(
        &self,
        id: &SitId,
        actual_start_date: NaiveDate,
    ) -> PricingResult<StorageInTransit> {
        self.transition(id, |sit| sit.place_into_sit(actual_start_date))
            .await
    }

    pub async fn deliver(
        &self,
        id: &SitId,
        delivery_date: NaiveDate,
    ) -> PricingResult<StorageInTransit> {
        self.transition(id, |sit| sit.deliver(delivery_date)).await
    }

    pub async fn release(
        &self,
        id: &SitId,
        release_date: NaiveDate,
    ) -> PricingResult<StorageInTransit> {
        self.transition(id, |sit| sit.release(release_date)).await
    }

    /// Load, change, re-validate and save one record. Any failure leaves the
    /// stored record untouched.
    async fn transition<F>(&self, id: &SitId, change: F) -> PricingResult<StorageInTransit>
    where
        F: FnOnce(&mut StorageInTransit) -> PricingResult<()> + Send,
    {
        let mut tx = self.store.begin().await?;
        let mut sit = load_sit(tx.as_ref(), id).await?;
        let from = sit.status;
        change(&mut sit)?;
        sit.validate().into_result()?;
        tx.save_sit(&sit).await?;
        tx.commit().await?;

        info!(sit_id = %sit.id, %from, to = %sit.status, "SIT status changed");
        Ok(sit)
    }
}

async fn load_sit(tx: &dyn Transaction, id: &SitId) -> PricingResult<StorageInTransit> {
    tx.sit(id)
        .await?
        .ok_or_else(|| PricingError::not_found("storage in transit", id))
}
