//! Distance between shipment endpoints

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{PricingError, PricingResult};
use crate::models::Address;

/// Driving distance provider
#[async_trait]
pub trait DistancePlanner: Send + Sync {
    /// Miles between two addresses
    async fn distance(&self, origin: &Address, destination: &Address) -> PricingResult<u32>;
}

/// Answers every request with the same mileage
#[derive(Debug, Clone, Copy)]
pub struct FixedDistancePlanner {
    miles: u32,
}

impl FixedDistancePlanner {
    pub fn new(miles: u32) -> Self {
        Self { miles }
    }
}

#[async_trait]
impl DistancePlanner for FixedDistancePlanner {
    async fn distance(&self, _origin: &Address, _destination: &Address) -> PricingResult<u32> {
        Ok(self.miles)
    }
}

/// Ask the planner for a distance, giving up after `timeout`.
///
/// Any failure, including the timeout, comes back as
/// `PricingError::DistanceUnavailable`.
pub async fn distance_with_timeout(
    planner: &dyn DistancePlanner,
    origin: &Address,
    destination: &Address,
    timeout: Duration,
) -> PricingResult<u32> {
    match tokio::time::timeout(timeout, planner.distance(origin, destination)).await {
        Ok(Ok(miles)) => {
            debug!(
                origin = origin.zip5(),
                destination = destination.zip5(),
                miles,
                "Planner distance"
            );
            Ok(miles)
        }
        Ok(Err(PricingError::DistanceUnavailable(reason))) => {
            Err(PricingError::DistanceUnavailable(reason))
        }
        Ok(Err(err)) => {
            warn!("Distance planner failed: {}", err);
            Err(PricingError::DistanceUnavailable(err.to_string()))
        }
        Err(_) => {
            warn!("Distance planner timed out after {:?}", timeout);
            Err(PricingError::DistanceUnavailable(format!(
                "no answer within {timeout:?}"
            )))
        }
    }
}
