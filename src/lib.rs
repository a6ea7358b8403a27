//! # hhg-pricing
//!
//! Pricing and carrier selection for household goods relocations.
//!
//! ## Modules
//!
//! - `carrier` - Traffic distribution groupings and best-value carrier selection
//! - `pricing` - Shipment and line item charge calculation
//! - `rates` - Tariff reference tables and rate lookup
//! - `routing` - Distance planning with a bounded wait
//! - `models` - Shipments, line items, storage in transit and their state machines
//! - `services` - Transactional line item, SIT and recalculation operations
//! - `store` - Record store abstraction with an in-memory implementation
//! - `quote` - Base charge quotes for hypothetical shipments
//! - `dataset` - JSON datasets for the CLI
pub mod carrier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod models;
pub mod pricing;
pub mod quote;
pub mod rates;
pub mod routing;
pub mod services;
pub mod store;
pub mod unit;

pub use error::{PricingError, PricingResult};
