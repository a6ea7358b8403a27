//! Storage in transit (SIT) records and their lifecycle

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{AddressId, ShipmentId, SitId};
use super::line_item::LineItemLocation;
use crate::error::{PricingError, PricingResult, ValidationErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SitLocation {
    Origin,
    Destination,
}

impl SitLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Origin => "ORIGIN",
            Self::Destination => "DESTINATION",
        }
    }

    pub fn line_item_location(self) -> LineItemLocation {
        match self {
            Self::Origin => LineItemLocation::Origin,
            Self::Destination => LineItemLocation::Destination,
        }
    }
}

impl fmt::Display for SitLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SitStatus {
    Requested,
    Approved,
    Denied,
    InSit,
    Released,
    Delivered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitAction {
    Approve,
    Deny,
    PlaceIntoSit,
    Deliver,
    Release,
}

impl SitAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Deny => "deny",
            Self::PlaceIntoSit => "place into SIT",
            Self::Deliver => "deliver",
            Self::Release => "release",
        }
    }
}

impl SitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "REQUESTED",
            Self::Approved => "APPROVED",
            Self::Denied => "DENIED",
            Self::InSit => "IN_SIT",
            Self::Released => "RELEASED",
            Self::Delivered => "DELIVERED",
        }
    }

    /// Status reached by applying `action` to a SIT at `location`.
    ///
    /// Leaving storage (deliver at destination, release at origin) reports a
    /// write conflict when the record was never occupied or sits at the other
    /// end; every other refusal is an invalid transition.
    pub fn transition(self, action: SitAction, location: SitLocation) -> PricingResult<Self> {
        use SitAction::*;
        use SitStatus::*;

        match (self, action, location) {
            (Requested | Denied, Approve, _) => Ok(Approved),
            (Requested | Approved, Deny, _) => Ok(Denied),
            (Approved, PlaceIntoSit, _) => Ok(InSit),
            (InSit, Deliver, SitLocation::Destination) => Ok(Delivered),
            (InSit, Release, SitLocation::Origin) => Ok(Released),

            (from, Deliver | Release, location) => Err(PricingError::write_conflict(format!(
                "cannot {} {} SIT in status {}",
                action.as_str(),
                location,
                from
            ))),
            (from, action, _) => Err(PricingError::invalid_transition(from, action.as_str())),
        }
    }

    /// Statuses in which the goods are or have been in the warehouse
    pub fn is_occupied(self) -> bool {
        matches!(self, Self::InSit | Self::Released | Self::Delivered)
    }
}

impl fmt::Display for SitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInTransit {
    pub id: SitId,
    pub shipment_id: ShipmentId,
    #[serde(default)]
    pub sit_number: Option<String>,
    pub status: SitStatus,
    pub location: SitLocation,
    pub estimated_start_date: NaiveDate,
    #[serde(default)]
    pub authorized_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub actual_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub out_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub authorization_notes: Option<String>,
    pub warehouse_id: String,
    pub warehouse_name: String,
    pub warehouse_address_id: AddressId,
    #[serde(default)]
    pub warehouse_phone: Option<String>,
    #[serde(default)]
    pub warehouse_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StorageInTransit {
    pub fn approve(
        &mut self,
        authorized_start_date: NaiveDate,
        authorization_notes: Option<String>,
    ) -> PricingResult<()> {
        self.status = self.status.transition(SitAction::Approve, self.location)?;
        self.authorized_start_date = Some(authorized_start_date);
        self.authorization_notes = authorization_notes;
        Ok(())
    }

    pub fn deny(&mut self, authorization_notes: Option<String>) -> PricingResult<()> {
        self.status = self.status.transition(SitAction::Deny, self.location)?;
        self.authorization_notes = authorization_notes;
        Ok(())
    }

    /// Record the goods entering the warehouse. The actual start may not
    /// precede the authorized start.
    pub fn place_into_sit(&mut self, actual_start_date: NaiveDate) -> PricingResult<()> {
        let next = self
            .status
            .transition(SitAction::PlaceIntoSit, self.location)?;
        if let Some(authorized) = self.authorized_start_date {
            if actual_start_date < authorized {
                return Err(PricingError::validation(
                    "actual_start_date",
                    format!("{actual_start_date} is before the authorized start date {authorized}"),
                ));
            }
        }
        self.status = next;
        self.actual_start_date = Some(actual_start_date);
        Ok(())
    }

    pub fn deliver(&mut self, delivery_date: NaiveDate) -> PricingResult<()> {
        self.status = self.status.transition(SitAction::Deliver, self.location)?;
        self.out_date = Some(delivery_date);
        Ok(())
    }

    pub fn release(&mut self, release_date: NaiveDate) -> PricingResult<()> {
        self.status = self.status.transition(SitAction::Release, self.location)?;
        self.out_date = Some(release_date);
        Ok(())
    }

    /// Whole days between entering and leaving storage, never negative.
    /// `None` until both dates are known.
    pub fn chargeable_days(&self) -> Option<i64> {
        let start = self.actual_start_date?;
        let out = self.out_date?;
        Some((out - start).num_days().max(0))
    }

    /// A new record starts as a request with no authorization or stay dates
    pub fn reset_lifecycle(&mut self) {
        self.status = SitStatus::Requested;
        self.authorized_start_date = None;
        self.actual_start_date = None;
        self.out_date = None;
    }

    /// Refuse a plain save that touches fields owned by the status actions.
    /// Occupied records also keep their location.
    pub fn ensure_lifecycle_unchanged(&self, stored: &StorageInTransit) -> PricingResult<()> {
        let mut changed = Vec::new();
        if self.status != stored.status {
            changed.push("status");
        }
        if self.authorized_start_date != stored.authorized_start_date {
            changed.push("authorized_start_date");
        }
        if self.actual_start_date != stored.actual_start_date {
            changed.push("actual_start_date");
        }
        if self.out_date != stored.out_date {
            changed.push("out_date");
        }
        if stored.status.is_occupied() && self.location != stored.location {
            changed.push("location");
        }
        if changed.is_empty() {
            return Ok(());
        }
        Err(PricingError::write_conflict(format!(
            "storage in transit {} is {}; {} can only change through its status actions",
            stored.id,
            stored.status,
            changed.join(", ")
        )))
    }

    pub fn is_removable(&self) -> bool {
        !self.status.is_occupied()
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("warehouse_id", &self.warehouse_id),
            ("warehouse_name", &self.warehouse_name),
        ] {
            if value.trim().is_empty() {
                errors.add(field, "can not be blank");
            }
        }
        for (field, value) in [
            ("sit_number", &self.sit_number),
            ("notes", &self.notes),
            ("authorization_notes", &self.authorization_notes),
            ("warehouse_phone", &self.warehouse_phone),
            ("warehouse_email", &self.warehouse_email),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                errors.add(field, "can not be blank when present");
            }
        }
        if self.status.is_occupied() && self.actual_start_date.is_none() {
            errors.add(
                "actual_start_date",
                format!("is required once the SIT is {}", self.status),
            );
        }
        if matches!(self.status, SitStatus::Released | SitStatus::Delivered)
            && self.out_date.is_none()
        {
            errors.add("out_date", format!("is required once the SIT is {}", self.status));
        }
        if let (Some(actual), Some(authorized)) =
            (self.actual_start_date, self.authorized_start_date)
        {
            if actual < authorized {
                errors.add(
                    "actual_start_date",
                    format!("{actual} is before the authorized start date {authorized}"),
                );
            }
        }
        if let (Some(out), Some(actual)) = (self.out_date, self.actual_start_date) {
            if out < actual {
                errors.add("out_date", format!("{out} is before the actual start date {actual}"));
            }
        }
        errors
    }
}
