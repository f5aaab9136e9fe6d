//! Run-wide, read-only apply settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::naming;

/// Settling delay applied after a management group is created. The remote
/// directory lags behind the create call, so children created immediately
/// afterwards can fail to find their parent.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Settings passed explicitly to every convergence call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyContext {
    /// Report what would be created instead of creating it.
    pub simulate_only: bool,

    /// Prefix joined to every declared management-group id with a hyphen.
    pub naming_prefix: String,

    /// Region for resources that need one (identity-bearing assignments).
    pub default_region: String,

    /// Wait after each management-group creation.
    #[serde(default = "default_settle_delay", with = "duration_secs")]
    pub settle_delay: Duration,
}

impl ApplyContext {
    pub fn new(naming_prefix: impl Into<String>, default_region: impl Into<String>) -> Self {
        Self {
            simulate_only: false,
            naming_prefix: naming_prefix.into(),
            default_region: default_region.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn simulated(mut self, simulate_only: bool) -> Self {
        self.simulate_only = simulate_only;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Fully-qualified id of a declared group.
    pub fn qualify(&self, short_id: &str) -> String {
        naming::qualify_group_id(&self.naming_prefix, short_id)
    }
}

fn default_settle_delay() -> Duration {
    DEFAULT_SETTLE_DELAY
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualify_uses_prefix() {
        let ctx = ApplyContext::new("Target", "westeurope");
        assert_eq!(ctx.qualify("ALZ"), "Target-ALZ");
        assert!(!ctx.simulate_only);
        assert_eq!(ctx.settle_delay, DEFAULT_SETTLE_DELAY);
    }

    #[test]
    fn test_builders() {
        let ctx = ApplyContext::new("", "westeurope")
            .simulated(true)
            .with_settle_delay(Duration::ZERO);
        assert!(ctx.simulate_only);
        assert_eq!(ctx.settle_delay, Duration::ZERO);
        assert_eq!(ctx.qualify("ALZ"), "ALZ");
    }
}
