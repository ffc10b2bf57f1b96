//! Twilio gateway.
//!
//! Uses Twilio Verify for OTP sessions (the provider generates and checks
//! codes) and the Messaging API for plain texts.
//!
//! # Example
//!
//! ```rust,ignore
//! use sms_otp::twilio::{TwilioGateway, TwilioSettings};
//! use sms_otp::{Channel, Destination, OtpService, OtpServiceTrait};
//!
//! let settings = TwilioSettings::from_env()?;
//! let service = OtpService::with_gateway(TwilioGateway::from_settings(settings)?);
//!
//! let destination = Destination::new("+15551230000")?;
//! let session = service.issue_otp(&destination, Channel::Sms).await?;
//! ```

mod client;
mod errors;
mod provider;
mod response;
mod settings;
mod types;

pub use client::{DEFAULT_API_URL, DEFAULT_VERIFY_URL, TwilioClient, TwilioClientBuilder};
pub use errors::{Result, SettingsError, TwilioApiError, TwilioError, TwilioErrorCode};
pub use provider::TwilioGateway;
pub use response::TwilioResponse;
pub use settings::{
    ENV_ACCOUNT_SID, ENV_AUTH_TOKEN, ENV_FROM_NUMBER, ENV_VERIFY_SERVICE_SID, TwilioSettings,
};
pub use types::{MessageResource, VerificationCheckResource, VerificationResource};
