//! Shipment line items and their approval lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AddressId, DimensionsId, InvoiceId, LineItemId, ShipmentId, SitId};
use super::tariff::{BaseCategory, TariffItem, ACTUAL_COST_CODE};
use crate::error::{PricingError, PricingResult, ValidationErrors};
use crate::unit::{BaseQuantity, Cents, FeeAndRate, Millicents, ThousandthInches};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemLocation {
    Origin,
    Destination,
    Neither,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineItemStatus {
    Submitted,
    ConditionallyApproved,
    Approved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineItemAction {
    Approve,
    ConditionallyApprove,
}

impl LineItemAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::ConditionallyApprove => "conditionally approve",
        }
    }
}

impl LineItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::ConditionallyApproved => "CONDITIONALLY_APPROVED",
            Self::Approved => "APPROVED",
        }
    }

    /// Status reached by applying `action`.
    ///
    /// The actual-cost item ("35A") is the one code allowed to move between
    /// the two approved statuses; every other item only leaves `Submitted`.
    pub fn transition(self, action: LineItemAction, tariff_code: &str) -> PricingResult<Self> {
        use LineItemAction::*;
        use LineItemStatus::*;

        let next = match (self, action) {
            (Submitted, Approve) => Approved,
            (Submitted, ConditionallyApprove) => ConditionallyApproved,

            (ConditionallyApproved, Approve) if tariff_code == ACTUAL_COST_CODE => Approved,
            (Approved, ConditionallyApprove) if tariff_code == ACTUAL_COST_CODE => {
                ConditionallyApproved
            }

            (from, action) => return Err(PricingError::invalid_transition(from, action.as_str())),
        };
        Ok(next)
    }

    /// Statuses that carry money
    pub fn is_priceable(self) -> bool {
        matches!(self, Self::ConditionallyApproved | Self::Approved)
    }
}

impl fmt::Display for LineItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item or crate measurements, owned by exactly one line item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub id: DimensionsId,
    pub length: ThousandthInches,
    pub width: ThousandthInches,
    pub height: ThousandthInches,
}

impl Dimensions {
    pub fn new(length: i32, width: i32, height: i32) -> Self {
        Self {
            id: DimensionsId::new(),
            length: ThousandthInches(length),
            width: ThousandthInches(width),
            height: ThousandthInches(height),
        }
    }

    /// Same measurements, whatever the record id
    pub fn same_size(&self, other: &Dimensions) -> bool {
        (self.length, self.width, self.height) == (other.length, other.width, other.height)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("length", self.length),
            ("width", self.width),
            ("height", self.height),
        ] {
            if value.0 <= 0 {
                errors.add(field, "must be greater than zero");
            }
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: LineItemId,
    pub shipment_id: ShipmentId,
    pub tariff_code: String,
    pub location: LineItemLocation,
    pub quantity_1: BaseQuantity,
    #[serde(default = "zero_quantity")]
    pub quantity_2: BaseQuantity,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: LineItemStatus,
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    #[serde(default)]
    pub estimate_amount_cents: Option<Cents>,
    #[serde(default)]
    pub actual_amount_cents: Option<Cents>,
    #[serde(default)]
    pub amount_cents: Option<Cents>,
    #[serde(default)]
    pub applied_rate: Option<Millicents>,
    pub submitted_date: DateTime<Utc>,
    #[serde(default)]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub item_dimensions_id: Option<DimensionsId>,
    #[serde(default)]
    pub crate_dimensions_id: Option<DimensionsId>,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub storage_in_transit_id: Option<SitId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn zero_quantity() -> BaseQuantity {
    BaseQuantity::ZERO
}

impl LineItem {
    /// A freshly submitted request
    pub fn new(
        shipment_id: ShipmentId,
        tariff_code: impl Into<String>,
        location: LineItemLocation,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LineItemId::new(),
            shipment_id,
            tariff_code: tariff_code.into(),
            location,
            quantity_1: BaseQuantity::ZERO,
            quantity_2: BaseQuantity::ZERO,
            notes: None,
            status: LineItemStatus::Submitted,
            invoice_id: None,
            estimate_amount_cents: None,
            actual_amount_cents: None,
            amount_cents: None,
            applied_rate: None,
            submitted_date: now,
            approved_date: None,
            item_dimensions_id: None,
            crate_dimensions_id: None,
            address_id: None,
            storage_in_transit_id: None,
            description: None,
            reason: None,
            created_at: now,
        }
    }

    /// Mandatory charge for `category`; system-created items start out approved.
    pub fn base(shipment_id: ShipmentId, category: BaseCategory, now: DateTime<Utc>) -> Self {
        let mut item = Self::new(shipment_id, category.code(), category.location(), now);
        item.status = LineItemStatus::Approved;
        item.approved_date = Some(now);
        item
    }

    pub fn approve(&mut self, now: DateTime<Utc>) -> PricingResult<()> {
        self.apply(LineItemAction::Approve, now)
    }

    pub fn conditionally_approve(&mut self, now: DateTime<Utc>) -> PricingResult<()> {
        self.apply(LineItemAction::ConditionallyApprove, now)
    }

    fn apply(&mut self, action: LineItemAction, now: DateTime<Utc>) -> PricingResult<()> {
        self.status = self.status.transition(action, &self.tariff_code)?;
        if self.approved_date.is_none() {
            self.approved_date = Some(now);
        }
        Ok(())
    }

    pub fn is_invoiced(&self) -> bool {
        self.invoice_id.is_some()
    }

    pub fn is_actual_cost(&self) -> bool {
        self.tariff_code == ACTUAL_COST_CODE
    }

    /// The approved actual-cost item keeps accepting its actual amount until
    /// it is invoiced
    fn actual_cost_still_open(&self) -> bool {
        self.is_actual_cost() && self.estimate_amount_cents.is_some() && !self.is_invoiced()
    }

    /// Guard for changes to quantities, location, notes and amounts
    pub fn ensure_mutable(&self) -> PricingResult<()> {
        if self.is_invoiced() {
            return Err(PricingError::forbidden(format!(
                "line item {} is invoiced",
                self.id
            )));
        }
        if self.status == LineItemStatus::Approved && !self.actual_cost_still_open() {
            return Err(PricingError::write_conflict(format!(
                "line item {} is approved and can no longer be changed",
                self.id
            )));
        }
        Ok(())
    }

    pub fn ensure_deletable(&self) -> PricingResult<()> {
        if self.is_invoiced() {
            return Err(PricingError::forbidden(format!(
                "line item {} is invoiced and cannot be deleted",
                self.id
            )));
        }
        Ok(())
    }

    /// Whether there is anything to price: an amount for actual-cost items,
    /// a quantity for everything else
    pub fn has_pricing_basis(&self, tariff: &TariffItem) -> bool {
        if tariff.is_actual_cost() {
            self.actual_amount_cents.is_some() || self.estimate_amount_cents.is_some()
        } else {
            !self.quantity_1.is_zero()
        }
    }

    pub fn set_price(&mut self, charge: FeeAndRate) {
        self.amount_cents = Some(charge.fee);
        self.applied_rate = Some(charge.rate);
    }

    pub fn clear_price(&mut self) {
        self.amount_cents = None;
        self.applied_rate = None;
    }

    pub fn owned_dimensions(&self) -> impl Iterator<Item = DimensionsId> {
        self.item_dimensions_id
            .into_iter()
            .chain(self.crate_dimensions_id)
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.tariff_code.trim().is_empty() {
            errors.add("tariff_code", "can not be blank");
        }
        if self.quantity_1.0 < 0 {
            errors.add("quantity_1", "can not be negative");
        }
        if self.quantity_2.0 < 0 {
            errors.add("quantity_2", "can not be negative");
        }
        for (field, amount) in [
            ("estimate_amount_cents", self.estimate_amount_cents),
            ("actual_amount_cents", self.actual_amount_cents),
        ] {
            if amount.is_some_and(|c| c.0 < 0) {
                errors.add(field, "can not be negative");
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LineItemAction::*;
    use LineItemStatus::*;

    fn item(code: &str, status: LineItemStatus) -> LineItem {
        let mut item = LineItem::new(ShipmentId::new(), code, LineItemLocation::Origin, Utc::now());
        item.status = status;
        item
    }

    #[test]
    fn test_transition_from_submitted() {
        assert_eq!(Submitted.transition(Approve, "105B").unwrap(), Approved);
        assert_eq!(
            Submitted.transition(ConditionallyApprove, "105B").unwrap(),
            ConditionallyApproved
        );
    }

    #[test]
    fn test_approved_items_cannot_regress() {
        for code in ["105B", "226A", "LHS", "185A"] {
            let err = Approved.transition(ConditionallyApprove, code).unwrap_err();
            assert!(matches!(err, PricingError::InvalidTransition { .. }));
            assert!(ConditionallyApproved.transition(Approve, code).is_err());
        }
    }

    #[test]
    fn test_actual_cost_moves_between_approved_states() {
        assert_eq!(
            Approved.transition(ConditionallyApprove, "35A").unwrap(),
            ConditionallyApproved
        );
        assert_eq!(
            ConditionallyApproved.transition(Approve, "35A").unwrap(),
            Approved
        );
        assert!(Approved.transition(Approve, "35A").is_err());
        assert!(ConditionallyApproved
            .transition(ConditionallyApprove, "35A")
            .is_err());
    }

    #[test]
    fn test_invalid_transition_reports_current_status() {
        let err = Approved.transition(ConditionallyApprove, "105B").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid transition: cannot conditionally approve from status APPROVED"
        );
    }

    #[test]
    fn test_approve_then_conditionally_approve_only_for_actual_cost() {
        let mut regular = item("105B", Submitted);
        regular.approve(Utc::now()).unwrap();
        assert!(regular.conditionally_approve(Utc::now()).is_err());
        assert_eq!(regular.status, Approved);

        let mut actual_cost = item("35A", Submitted);
        actual_cost.approve(Utc::now()).unwrap();
        actual_cost.conditionally_approve(Utc::now()).unwrap();
        assert_eq!(actual_cost.status, ConditionallyApproved);
    }

    #[test]
    fn test_approved_date_set_once() {
        let mut li = item("35A", Submitted);
        let first = Utc::now();
        li.conditionally_approve(first).unwrap();
        li.approve(first + chrono::Duration::days(2)).unwrap();
        assert_eq!(li.approved_date, Some(first));
    }

    #[test]
    fn test_approved_baseline_is_frozen() {
        let li = item("105B", Approved);
        let err = li.ensure_mutable().unwrap_err();
        assert!(matches!(err, PricingError::WriteConflict(_)));
        assert!(item("105B", Submitted).ensure_mutable().is_ok());
    }

    #[test]
    fn test_actual_cost_stays_open_until_invoiced() {
        let mut li = item("35A", Approved);
        assert!(li.ensure_mutable().is_err());

        li.estimate_amount_cents = Some(Cents(10_000));
        assert!(li.ensure_mutable().is_ok());

        li.invoice_id = Some(InvoiceId::new());
        assert!(matches!(
            li.ensure_mutable().unwrap_err(),
            PricingError::Forbidden(_)
        ));
    }

    #[test]
    fn test_invoiced_item_not_deletable() {
        let mut li = item("105B", Submitted);
        assert!(li.ensure_deletable().is_ok());
        li.invoice_id = Some(InvoiceId::new());
        assert!(matches!(
            li.ensure_deletable().unwrap_err(),
            PricingError::Forbidden(_)
        ));
    }

    #[test]
    fn test_base_item_starts_approved() {
        let li = LineItem::base(ShipmentId::new(), BaseCategory::Unpack, Utc::now());
        assert_eq!(li.tariff_code, "105C");
        assert_eq!(li.status, Approved);
        assert_eq!(li.location, LineItemLocation::Destination);
        assert!(li.approved_date.is_some());
    }

    #[test]
    fn test_dimensions_validation() {
        assert!(!Dimensions::new(1000, 1000, 1000).validate().has_any());
        let errors = Dimensions::new(0, -5, 1000).validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_owned_dimensions() {
        let mut li = item("105B", Submitted);
        assert_eq!(li.owned_dimensions().count(), 0);
        li.item_dimensions_id = Some(DimensionsId::new());
        li.crate_dimensions_id = Some(DimensionsId::new());
        assert_eq!(li.owned_dimensions().count(), 2);
    }
}
