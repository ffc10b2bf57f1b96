//! OTP issuance and verification service with per-destination rate limiting.

pub(crate) mod config;
pub(crate) mod error;
pub(crate) mod structure;
pub(crate) mod traits;

pub use config::{ConfigError, DEFAULT_APPROVAL_STATUS, OtpServiceConfig, OtpServiceConfigBuilder};
pub use error::OtpServiceError;
pub use structure::{MAX_MESSAGE_LENGTH, OtpService, OtpServiceBuilder};
pub use traits::OtpServiceTrait;
