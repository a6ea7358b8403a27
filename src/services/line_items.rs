//! Staff-facing line item operations: pre-approval requests, updates,
//! approvals and deletion

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::{pricing_action, shipment_discount, PricingAction};
use crate::error::{PricingError, PricingResult, ValidationErrors};
use crate::models::{
    Address, Dimensions, DimensionsId, LineItem, LineItemId, LineItemLocation, LineItemStatus,
    Shipment, ShipmentId, TariffItem,
};
use crate::pricing::CostCalculator;
use crate::store::{RecordStore, Transaction};
use crate::unit::{BaseQuantity, Cents};

/// Fields a user supplies when requesting or editing an accessorial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemParams {
    pub tariff_code: String,
    pub location: LineItemLocation,
    pub quantity_1: BaseQuantity,
    #[serde(default = "zero")]
    pub quantity_2: BaseQuantity,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub estimate_amount_cents: Option<Cents>,
    #[serde(default)]
    pub actual_amount_cents: Option<Cents>,
    #[serde(default)]
    pub item_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub crate_dimensions: Option<Dimensions>,
    #[serde(default)]
    pub address: Option<Address>,
}

fn zero() -> BaseQuantity {
    BaseQuantity::ZERO
}

impl LineItemParams {
    pub fn new(tariff_code: impl Into<String>, location: LineItemLocation) -> Self {
        Self {
            tariff_code: tariff_code.into(),
            location,
            quantity_1: BaseQuantity::ZERO,
            quantity_2: BaseQuantity::ZERO,
            notes: None,
            description: None,
            reason: None,
            estimate_amount_cents: None,
            actual_amount_cents: None,
            item_dimensions: None,
            crate_dimensions: None,
            address: None,
        }
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(dimensions) = &self.item_dimensions {
            errors.append_prefixed("item_dimensions", dimensions.validate());
        }
        if let Some(dimensions) = &self.crate_dimensions {
            errors.append_prefixed("crate_dimensions", dimensions.validate());
        }
        if let Some(address) = &self.address {
            errors.append_prefixed("address", address.validate());
        }
        errors
    }
}

/// Line item operations, each in its own transaction
#[derive(Clone)]
pub struct LineItemService {
    store: Arc<dyn RecordStore>,
    calculator: CostCalculator,
}

impl LineItemService {
    pub fn new(store: Arc<dyn RecordStore>, calculator: CostCalculator) -> Self {
        Self { store, calculator }
    }

    fn pre_approval_item(&self, code: &str) -> PricingResult<&TariffItem> {
        let tariff = self.calculator.rates().tariff_item(code)?;
        if !tariff.requires_pre_approval {
            return Err(PricingError::forbidden(format!(
                "tariff item {code} does not require pre-approval"
            )));
        }
        Ok(tariff)
    }

    /// Record a new accessorial request against a shipment
    pub async fn create_preapproval_request(
        &self,
        shipment_id: &ShipmentId,
        params: LineItemParams,
    ) -> PricingResult<LineItem> {
        self.pre_approval_item(&params.tariff_code)?;

        let mut tx = self.store.begin().await?;
        load_shipment(tx.as_ref(), shipment_id).await?;

        let mut item = LineItem::new(
            *shipment_id,
            params.tariff_code.clone(),
            params.location,
            Utc::now(),
        );
        apply_params(tx.as_mut(), &mut item, params).await?;
        tx.save_line_item(&item).await?;
        tx.commit().await?;

        info!(
            line_item_id = %item.id,
            shipment_id = %shipment_id,
            code = %item.tariff_code,
            "Created pre-approval request"
        );
        Ok(item)
    }

    /// Change a request's baseline. Approved items are frozen, except an
    /// open actual-cost item whose amounts may still move. For actual-cost
    /// items the status and price then follow the actual amount.
    pub async fn update_line_item(
        &self,
        id: &LineItemId,
        params: LineItemParams,
    ) -> PricingResult<LineItem> {
        let mut tx = self.store.begin().await?;
        let mut item = load_line_item(tx.as_ref(), id).await?;
        let shipment = load_shipment(tx.as_ref(), &item.shipment_id).await?;

        item.ensure_mutable()?;
        ensure_baseline_unchanged(tx.as_ref(), &item, &params).await?;
        let tariff = self.pre_approval_item(&params.tariff_code)?;

        item.tariff_code = params.tariff_code.clone();
        apply_params(tx.as_mut(), &mut item, params).await?;

        if item.is_actual_cost() && item.status.is_priceable() {
            let now = Utc::now();
            if item.actual_amount_cents.is_some() {
                if shipment.status.is_priceable() {
                    self.price(tx.as_ref(), &mut item, &shipment).await?;
                }
                if item.status == LineItemStatus::ConditionallyApproved {
                    item.approve(now)?;
                }
            } else {
                if shipment.status.is_priceable() {
                    item.clear_price();
                }
                if item.status == LineItemStatus::Approved {
                    item.conditionally_approve(now)?;
                }
            }
        } else {
            self.apply_trigger(tx.as_ref(), &mut item, tariff, &shipment)
                .await?;
        }

        tx.save_line_item(&item).await?;
        tx.commit().await?;
        debug!(line_item_id = %item.id, status = %item.status, "Updated line item");
        Ok(item)
    }

    /// Approve a request. An actual-cost item that only has an estimate is
    /// conditionally approved instead. Delivered shipments get the approved
    /// item priced immediately.
    pub async fn approve_line_item(&self, id: &LineItemId) -> PricingResult<LineItem> {
        let mut tx = self.store.begin().await?;
        let mut item = load_line_item(tx.as_ref(), id).await?;
        self.pre_approval_item(&item.tariff_code)?;
        let shipment = load_shipment(tx.as_ref(), &item.shipment_id).await?;

        let now = Utc::now();
        if item.is_actual_cost()
            && item.estimate_amount_cents.is_some()
            && item.actual_amount_cents.is_none()
        {
            item.conditionally_approve(now)?;
        } else {
            item.approve(now)?;
        }

        if shipment.status.is_priceable() && item.status == LineItemStatus::Approved {
            self.price(tx.as_ref(), &mut item, &shipment).await?;
        }

        tx.save_line_item(&item).await?;
        tx.commit().await?;
        info!(line_item_id = %item.id, status = %item.status, "Approved line item");
        Ok(item)
    }

    /// Remove a request with its dimensions and address. Invoiced items and
    /// mandatory base items cannot be deleted.
    pub async fn delete_line_item(&self, id: &LineItemId) -> PricingResult<LineItem> {
        let mut tx = self.store.begin().await?;
        let item = load_line_item(tx.as_ref(), id).await?;
        item.ensure_deletable()?;
        self.pre_approval_item(&item.tariff_code)?;

        tx.delete_line_item(&item.id).await?;
        for dimensions_id in item.owned_dimensions() {
            if tx.dimensions(&dimensions_id).await?.is_some() {
                tx.delete_dimensions(&dimensions_id).await?;
            }
        }
        if let Some(address_id) = item.address_id {
            if tx.address(&address_id).await?.is_some() {
                tx.delete_address(&address_id).await?;
            }
        }
        tx.commit().await?;

        info!(line_item_id = %item.id, code = %item.tariff_code, "Deleted line item");
        Ok(item)
    }

    /// Price, clear or leave an item according to its status, pricing basis
    /// and the shipment's delivery. Does not save.
    async fn apply_trigger(
        &self,
        tx: &dyn Transaction,
        item: &mut LineItem,
        tariff: &TariffItem,
        shipment: &Shipment,
    ) -> PricingResult<PricingAction> {
        let action = pricing_action(item, tariff, shipment);
        match action {
            PricingAction::Price => self.price(tx, item, shipment).await?,
            PricingAction::Clear => item.clear_price(),
            PricingAction::Skip => {}
        }
        Ok(action)
    }

    async fn price(
        &self,
        tx: &dyn Transaction,
        item: &mut LineItem,
        shipment: &Shipment,
    ) -> PricingResult<()> {
        let discount = shipment_discount(tx, shipment).await?;
        let charge = self
            .calculator
            .compute_line_item_charge(item, shipment, discount)?;
        item.set_price(charge);
        Ok(())
    }
}

async fn load_shipment(tx: &dyn Transaction, id: &ShipmentId) -> PricingResult<Shipment> {
    tx.shipment(id)
        .await?
        .ok_or_else(|| PricingError::not_found("shipment", id))
}

async fn load_line_item(tx: &dyn Transaction, id: &LineItemId) -> PricingResult<LineItem> {
    tx.line_item(id)
        .await?
        .ok_or_else(|| PricingError::not_found("line item", id))
}

/// An approved item keeps its tariff item, location, quantities and
/// dimensions. Only the amounts of an open actual-cost item may move.
async fn ensure_baseline_unchanged(
    tx: &dyn Transaction,
    item: &LineItem,
    params: &LineItemParams,
) -> PricingResult<()> {
    if item.status != LineItemStatus::Approved {
        return Ok(());
    }

    let mut changed = Vec::new();
    if params.tariff_code != item.tariff_code {
        changed.push("tariff_code");
    }
    if params.location != item.location {
        changed.push("location");
    }
    if params.quantity_1 != item.quantity_1 {
        changed.push("quantity_1");
    }
    if params.quantity_2 != item.quantity_2 {
        changed.push("quantity_2");
    }
    for (field, stored_id, requested) in [
        ("item_dimensions", item.item_dimensions_id, &params.item_dimensions),
        ("crate_dimensions", item.crate_dimensions_id, &params.crate_dimensions),
    ] {
        let stored = match stored_id {
            Some(id) => tx.dimensions(&id).await?,
            None => None,
        };
        let same = match (&stored, requested) {
            (Some(stored), Some(requested)) => stored.same_size(requested),
            (None, None) => true,
            _ => false,
        };
        if !same {
            changed.push(field);
        }
    }

    if changed.is_empty() {
        return Ok(());
    }
    Err(PricingError::write_conflict(format!(
        "line item {} is approved; {} can no longer be changed",
        item.id,
        changed.join(", ")
    )))
}

/// Copy user fields onto `item`, validate everything and persist owned
/// dimensions and address. Owned records dropped from the params are deleted.
async fn apply_params(
    tx: &mut dyn Transaction,
    item: &mut LineItem,
    params: LineItemParams,
) -> PricingResult<()> {
    let mut errors = params.validate();

    item.location = params.location;
    item.quantity_1 = params.quantity_1;
    item.quantity_2 = params.quantity_2;
    item.notes = params.notes;
    item.description = params.description;
    item.reason = params.reason;
    item.estimate_amount_cents = params.estimate_amount_cents;
    item.actual_amount_cents = params.actual_amount_cents;
    errors.append(item.validate());
    errors.into_result()?;

    item.item_dimensions_id =
        replace_dimensions(tx, item.item_dimensions_id, params.item_dimensions).await?;
    item.crate_dimensions_id =
        replace_dimensions(tx, item.crate_dimensions_id, params.crate_dimensions).await?;

    item.address_id = match (item.address_id, params.address) {
        (existing, Some(mut address)) => {
            if let Some(id) = existing {
                address.id = id;
            }
            tx.save_address(&address).await?;
            Some(address.id)
        }
        (Some(existing), None) => {
            tx.delete_address(&existing).await?;
            None
        }
        (None, None) => None,
    };
    Ok(())
}

async fn replace_dimensions(
    tx: &mut dyn Transaction,
    existing: Option<DimensionsId>,
    replacement: Option<Dimensions>,
) -> PricingResult<Option<DimensionsId>> {
    match (existing, replacement) {
        (existing, Some(mut dimensions)) => {
            if let Some(id) = existing {
                dimensions.id = id;
            }
            tx.save_dimensions(&dimensions).await?;
            Ok(Some(dimensions.id))
        }
        (Some(id), None) => {
            tx.delete_dimensions(&id).await?;
            Ok(None)
        }
        (None, None) => Ok(None),
    }
}
