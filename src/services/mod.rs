//! Transactional operations over shipments, line items and SIT records

pub mod line_items;
pub mod recalculate;
pub mod sit;

pub use line_items::{LineItemParams, LineItemService};
pub use recalculate::{
    missing_base_categories, verify_base_line_items, PricingFailure, RecalculationReport,
    Recalculator,
};
pub use sit::SitService;

use crate::error::{PricingError, PricingResult};
use crate::models::{LineItem, Shipment, TariffItem};
use crate::store::Transaction;
use crate::unit::DiscountRate;

/// What the pricing trigger does to one line item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingAction {
    /// Compute amount and applied rate
    Price,
    /// Nothing left to price; drop any stale amount
    Clear,
    /// Leave the item as it is
    Skip,
}

/// Decide how a line item's price follows its status, its pricing basis and
/// the shipment's delivery
pub fn pricing_action(item: &LineItem, tariff: &TariffItem, shipment: &Shipment) -> PricingAction {
    if item.is_invoiced() || !item.status.is_priceable() || !shipment.status.is_priceable() {
        return PricingAction::Skip;
    }
    if item.has_pricing_basis(tariff) {
        PricingAction::Price
    } else {
        PricingAction::Clear
    }
}

/// Discount of the carrier performance linked to the shipment
pub(crate) async fn shipment_discount(
    tx: &dyn Transaction,
    shipment: &Shipment,
) -> PricingResult<DiscountRate> {
    let performance_id = shipment
        .carrier_performance_id
        .ok_or_else(|| PricingError::not_found("carrier performance", shipment.id))?;
    let performance = tx
        .carrier_performance(&performance_id)
        .await?
        .ok_or_else(|| PricingError::not_found("carrier performance", performance_id))?;
    Ok(performance.linehaul_rate)
}
