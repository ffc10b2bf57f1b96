//! # SMS OTP
//!
//! One-time passcode issuance and verification over SMS or voice, with a
//! provider abstraction and per-destination rate limiting.
//!
//! The service asks a gateway to start a verification, remembers when each
//! destination was last issued a code, and refuses re-issuance inside the
//! configured window (60 seconds by default). Verification checks and
//! session lookups are normalized into typed outcomes, so a wrong code
//! ([`CheckOutcome::Rejected`]) is never confused with a failed call
//! ([`OtpServiceError::Provider`]).
//!
//! ## Supported Gateways
//!
//! | Gateway | Feature | Website |
//! |---------|---------|---------|
//! | Twilio Verify + Messaging | `twilio` (default) | <https://www.twilio.com/docs/verify> |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sms_otp::twilio::{TwilioGateway, TwilioSettings};
//! use sms_otp::{Channel, Destination, OtpCode, OtpService, OtpServiceTrait};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = TwilioGateway::from_settings(TwilioSettings::from_env()?)?;
//!     let service = OtpService::with_gateway(gateway);
//!
//!     let destination = Destination::new("+1 (555) 123-0000")?;
//!     let session = service.issue_otp(&destination, Channel::Sms).await?;
//!     println!("Started session {session}");
//!
//!     let outcome = service
//!         .verify_otp(&destination, &OtpCode::new("123456")?)
//!         .await?;
//!     println!("Approved: {}", outcome.is_approved());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! OtpService<G> ──► RateLimiter   (per-destination window, DashMap)
//!         │
//!         ▼
//! RetryableGateway<G>  (optional retry wrapper, reads only)
//!         │
//!         ▼
//!     Gateway          (trait: TwilioGateway, etc.)
//! ```
//!
//! ## Features
//!
//! - `twilio` - Twilio gateway (enabled by default)
//! - `tracing` - OpenTelemetry tracing instrumentation (enabled by default)
//! - `metrics` - OpenTelemetry counters for issuance, throttling, checks and messages
//! - `test-helpers` - Exposes [`limiter::MockClock`] outside this crate's tests

pub mod errors;
pub mod limiter;
#[cfg(feature = "metrics")]
mod metrics;
pub mod providers;
pub mod service;
pub mod types;
mod utils;

#[cfg(feature = "twilio")]
pub use providers::twilio;

// Re-export commonly used types at the crate root
pub use errors::RetryableError;
pub use providers::{Gateway, OnRetryCallback, RetryableGateway};
pub use service::{
    ConfigError, OtpService, OtpServiceBuilder, OtpServiceConfig, OtpServiceConfigBuilder,
    OtpServiceError, OtpServiceTrait,
};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    Channel, ChannelError, CheckOutcome, Delivery, Destination, DestinationError, MessageReceipt,
    OtpCode, OtpCodeError, SessionId, VerificationOutcome,
};
pub use utils::retry::RetryConfig;
