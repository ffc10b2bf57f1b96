//! Twilio account settings.

use super::errors::SettingsError;
use crate::types::Destination;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Environment variable holding the account SID.
pub const ENV_ACCOUNT_SID: &str = "TWILIO_ACCOUNT_SID";
/// Environment variable holding the auth token.
pub const ENV_AUTH_TOKEN: &str = "TWILIO_AUTH_TOKEN";
/// Environment variable holding the sender number.
pub const ENV_FROM_NUMBER: &str = "TWILIO_FROM_NUMBER";
/// Environment variable holding the Verify service SID.
pub const ENV_VERIFY_SERVICE_SID: &str = "TWILIO_VERIFY_SERVICE_SID";

/// Credentials and identifiers for a Twilio account.
///
/// Loaded once at startup and not changed afterwards. The auth token is
/// kept in a [`SecretString`] and never printed.
///
/// # Example
///
/// ```rust
/// use sms_otp::twilio::TwilioSettings;
///
/// let settings: TwilioSettings = serde_json::from_str(r#"{
///     "account_sid": "AC00000000000000000000000000000000",
///     "auth_token": "hunter2",
///     "from_number": "+15550000000",
///     "verify_service_sid": "VA00000000000000000000000000000000"
/// }"#).unwrap();
/// settings.validate().unwrap();
/// assert!(!format!("{settings:?}").contains("hunter2"));
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioSettings {
    /// Account SID ("AC...").
    pub account_sid: String,
    /// Auth token.
    pub auth_token: SecretString,
    /// Sender number for plain messages, E.164.
    pub from_number: String,
    /// Verify service SID ("VA...").
    pub verify_service_sid: String,
}

impl TwilioSettings {
    /// Create settings from explicit values.
    pub fn new(
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        from_number: impl Into<String>,
        verify_service_sid: impl Into<String>,
    ) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: SecretString::from(auth_token.into()),
            from_number: from_number.into(),
            verify_service_sid: verify_service_sid.into(),
        }
    }

    /// Read settings from `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`,
    /// `TWILIO_FROM_NUMBER` and `TWILIO_VERIFY_SERVICE_SID`, then validate.
    pub fn from_env() -> Result<Self, SettingsError> {
        let var = |name: &'static str| std::env::var(name).map_err(|_| SettingsError::MissingVar(name));

        let settings = Self::new(
            var(ENV_ACCOUNT_SID)?,
            var(ENV_AUTH_TOKEN)?,
            var(ENV_FROM_NUMBER)?,
            var(ENV_VERIFY_SERVICE_SID)?,
        );
        settings.validate()?;
        Ok(settings)
    }

    /// Check that all fields are present and well-formed.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.account_sid.trim().is_empty() {
            return Err(SettingsError::Empty("account_sid"));
        }
        if !self.account_sid.starts_with("AC") {
            return Err(SettingsError::InvalidAccountSid);
        }
        if self.auth_token.expose_secret().trim().is_empty() {
            return Err(SettingsError::Empty("auth_token"));
        }
        if self.verify_service_sid.trim().is_empty() {
            return Err(SettingsError::Empty("verify_service_sid"));
        }
        if !self.verify_service_sid.starts_with("VA") {
            return Err(SettingsError::InvalidServiceSid);
        }
        self.sender()?;
        Ok(())
    }

    /// Sender number as a normalized destination.
    pub fn sender(&self) -> Result<Destination, SettingsError> {
        Destination::new(&self.from_number).map_err(SettingsError::InvalidFromNumber)
    }
}
