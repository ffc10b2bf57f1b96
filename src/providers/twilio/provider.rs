//! Twilio gateway implementation.

use super::client::TwilioClient;
use super::errors::{Result, TwilioError};
use super::settings::TwilioSettings;
use crate::providers::traits::Gateway;
use crate::types::{Channel, Destination, MessageReceipt, OtpCode, SessionId};

#[cfg(feature = "tracing")]
use tracing::debug;

/// Twilio implementation of [`Gateway`].
///
/// Verification sessions go through Twilio Verify, plain messages through
/// the Messaging API using the configured sender number.
///
/// # Example
///
/// ```rust,ignore
/// use sms_otp::twilio::{TwilioGateway, TwilioSettings};
/// use sms_otp::OtpService;
///
/// let gateway = TwilioGateway::from_settings(TwilioSettings::from_env()?)?;
/// let service = OtpService::with_gateway(gateway);
/// ```
#[derive(Debug, Clone)]
pub struct TwilioGateway {
    client: TwilioClient,
}

impl TwilioGateway {
    /// Wrap an existing client.
    pub fn new(client: TwilioClient) -> Self {
        Self { client }
    }

    /// Build a client from settings and wrap it.
    pub fn from_settings(settings: TwilioSettings) -> Result<Self> {
        Ok(Self::new(TwilioClient::new(settings)?))
    }

    /// Get reference to the inner client.
    pub fn client(&self) -> &TwilioClient {
        &self.client
    }
}

impl Gateway for TwilioGateway {
    type Error = TwilioError;

    async fn start_verification(&self, to: &Destination, channel: Channel) -> Result<SessionId> {
        let verification = self.client.create_verification(to, channel).await?;

        #[cfg(feature = "tracing")]
        debug!(
            session_id = %verification.sid,
            status = %verification.status,
            "Verification started"
        );

        Ok(verification.sid)
    }

    async fn check_verification(&self, to: &Destination, code: &OtpCode) -> Result<String> {
        let check = self.client.create_verification_check(to, code).await?;
        Ok(check.status)
    }

    async fn fetch_verification_status(&self, session: &SessionId) -> Result<String> {
        let verification = self.client.fetch_verification(session).await?;
        Ok(verification.status)
    }

    async fn send_message(&self, to: &Destination, body: &str) -> Result<MessageReceipt> {
        let message = self.client.create_message(to, body).await?;
        Ok(MessageReceipt::from(message))
    }

    fn name(&self) -> &'static str {
        "twilio"
    }
}
