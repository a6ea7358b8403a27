use serde::{Deserialize, Serialize};

use super::ids::AddressId;
use crate::error::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub street_address_1: String,
    #[serde(default)]
    pub street_address_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

impl Address {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("street_address_1", &self.street_address_1),
            ("city", &self.city),
            ("state", &self.state),
            ("postal_code", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                errors.add(field, "can not be blank");
            }
        }
        if let Some(street) = &self.street_address_2 {
            if street.trim().is_empty() {
                errors.add("street_address_2", "can not be blank when present");
            }
        }
        errors
    }

    /// First five digits of the postal code
    pub fn zip5(&self) -> &str {
        let trimmed = self.postal_code.trim();
        trimmed.get(..5).unwrap_or(trimmed)
    }
}
