//! Engine configuration
//!
//! Values come from the built-in defaults, then an optional TOML file, then
//! `HHG_PRICING_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::carrier::DEFAULT_CODE_OF_SERVICE;
use crate::error::{PricingError, PricingResult};
use crate::pricing::DEFAULT_LINEHAUL_CODE;

fn default_distance_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Upper bound on one distance planner call
    #[serde(with = "humantime_serde")]
    pub distance_timeout: Duration,
    pub code_of_service: String,
    pub log_level: String,
    /// Tariff code of the shipment's linehaul charge
    pub linehaul_code: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            distance_timeout: default_distance_timeout(),
            code_of_service: DEFAULT_CODE_OF_SERVICE.to_string(),
            log_level: "info".to_string(),
            linehaul_code: DEFAULT_LINEHAUL_CODE.to_string(),
        }
    }
}

impl PricingConfig {
    pub fn from_toml_str(content: &str) -> PricingResult<Self> {
        toml::from_str(content).map_err(|e| PricingError::Config(e.to_string()))
    }

    /// Defaults, overlaid by `path` when given, overlaid by the environment
    pub async fn load(path: Option<&Path>) -> PricingResult<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path).await.map_err(|e| {
                    PricingError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                debug!("Loaded configuration from {}", path.display());
                Self::from_toml_str(&content)?
            }
            None => Self::default(),
        };
        config.merge_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) -> PricingResult<()> {
        if let Ok(timeout) = std::env::var("HHG_PRICING_DISTANCE_TIMEOUT") {
            self.distance_timeout = humantime_serde::re::humantime::parse_duration(&timeout)
                .map_err(|e| {
                    PricingError::Config(format!(
                        "HHG_PRICING_DISTANCE_TIMEOUT={timeout:?} is not a duration: {e}"
                    ))
                })?;
        }

        if let Ok(code) = std::env::var("HHG_PRICING_CODE_OF_SERVICE") {
            self.code_of_service = code;
        }

        if let Ok(log_level) = std::env::var("HHG_PRICING_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Ok(code) = std::env::var("HHG_PRICING_LINEHAUL_CODE") {
            self.linehaul_code = code;
        }
        Ok(())
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.distance_timeout.is_zero() {
            return Err(PricingError::Config(
                "distance_timeout must be greater than zero".into(),
            ));
        }
        if self.code_of_service.trim().is_empty() {
            return Err(PricingError::Config("code_of_service can not be blank".into()));
        }
        if self.linehaul_code.trim().is_empty() {
            return Err(PricingError::Config("linehaul_code can not be blank".into()));
        }
        Ok(())
    }
}
