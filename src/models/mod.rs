//! Records the pricing engine reads and writes

pub mod address;
pub mod carrier;
pub mod ids;
pub mod line_item;
pub mod shipment;
pub mod sit;
pub mod tariff;

pub use address::Address;
pub use carrier::{
    Carrier, CarrierPerformance, GroupingKey, PerformanceCandidate, TrafficDistributionGrouping,
};
pub use ids::{
    AddressId, CarrierId, DimensionsId, GroupingId, InvoiceId, LineItemId, PerformanceId,
    ShipmentId, SitId,
};
pub use line_item::{Dimensions, LineItem, LineItemAction, LineItemLocation, LineItemStatus};
pub use shipment::{Shipment, ShipmentStatus};
pub use sit::{SitAction, SitLocation, SitStatus, StorageInTransit};
pub use tariff::{BaseCategory, DiscountType, MeasurementUnit, TariffItem, TariffRate};
