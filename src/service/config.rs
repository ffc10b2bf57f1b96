//! Service configuration types.

use crate::limiter::{DEFAULT_MAX_ENTRIES, DEFAULT_MIN_INTERVAL};
use std::time::Duration;
use thiserror::Error;

/// Raw status the provider reports for an approved code.
pub const DEFAULT_APPROVAL_STATUS: &str = "approved";

/// Invalid service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Re-issuance interval is zero.
    #[error("min_interval must be greater than zero")]
    ZeroInterval,
    /// Approval sentinel is empty.
    #[error("approval_status cannot be empty")]
    EmptyApprovalStatus,
    /// Destination capacity is zero.
    #[error("max_tracked_destinations must be greater than zero")]
    ZeroCapacity,
    /// Gateway timeout is set to zero.
    #[error("gateway_timeout must be greater than zero when set")]
    ZeroTimeout,
}

/// Configuration for the OTP service.
///
/// Controls the re-issuance window, the approval sentinel and how long a
/// single gateway call may take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpServiceConfig {
    /// Minimum time between two issuances for the same destination.
    pub min_interval: Duration,
    /// Raw check status that counts as approval (compared exactly).
    pub approval_status: String,
    /// Upper bound for a single gateway call. `None` waits as long as the
    /// gateway does.
    pub gateway_timeout: Option<Duration>,
    /// Tracked destinations above which stale entries are pruned on insert.
    pub max_tracked_destinations: usize,
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
            approval_status: DEFAULT_APPROVAL_STATUS.to_string(),
            gateway_timeout: None,
            max_tracked_destinations: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl OtpServiceConfig {
    /// Create a new builder for OtpServiceConfig.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sms_otp::OtpServiceConfig;
    /// use std::time::Duration;
    ///
    /// let config = OtpServiceConfig::builder()
    ///     .min_interval(Duration::from_secs(30))
    ///     .gateway_timeout(Duration::from_secs(10))
    ///     .build();
    ///
    /// assert_eq!(config.min_interval, Duration::from_secs(30));
    /// assert_eq!(config.gateway_timeout, Some(Duration::from_secs(10)));
    /// assert_eq!(config.approval_status, "approved");
    /// ```
    pub fn builder() -> OtpServiceConfigBuilder {
        OtpServiceConfigBuilder::default()
    }

    /// Create a new config with a custom re-issuance interval.
    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    /// Create a new config with a custom approval sentinel.
    pub fn with_approval_status(mut self, status: impl Into<String>) -> Self {
        self.approval_status = status.into();
        self
    }

    /// Create a new config with a gateway call timeout.
    pub fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = Some(timeout);
        self
    }

    /// Create a new config with a custom destination capacity.
    pub fn with_max_tracked_destinations(mut self, max: usize) -> Self {
        self.max_tracked_destinations = max;
        self
    }

    /// Check that the values make sense together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.approval_status.is_empty() {
            return Err(ConfigError::EmptyApprovalStatus);
        }
        if self.max_tracked_destinations == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.gateway_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Builder for OtpServiceConfig.
#[derive(Debug, Clone, Default)]
pub struct OtpServiceConfigBuilder {
    pub(crate) config: OtpServiceConfig,
}

impl OtpServiceConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum re-issuance interval per destination.
    ///
    /// Default: 60 seconds
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.config.min_interval = interval;
        self
    }

    /// Set the raw status that counts as approval.
    ///
    /// Default: "approved"
    pub fn approval_status(mut self, status: impl Into<String>) -> Self {
        self.config.approval_status = status.into();
        self
    }

    /// Set the timeout for a single gateway call.
    ///
    /// Default: none
    pub fn gateway_timeout(mut self, timeout: Duration) -> Self {
        self.config.gateway_timeout = Some(timeout);
        self
    }

    /// Set the destination capacity of the rate limiter.
    ///
    /// Default: 100 000
    pub fn max_tracked_destinations(mut self, max: usize) -> Self {
        self.config.max_tracked_destinations = max;
        self
    }

    /// Build the OtpServiceConfig.
    pub fn build(self) -> OtpServiceConfig {
        self.config
    }
}
