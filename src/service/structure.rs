//! Main service implementation.

use super::config::{ConfigError, OtpServiceConfig, OtpServiceConfigBuilder};
use super::error::OtpServiceError;
use super::traits::OtpServiceTrait;
use crate::limiter::{Clock, RateLimiter, SystemClock};
use crate::providers::traits::Gateway;
use crate::types::{
    Channel, CheckOutcome, Delivery, Destination, OtpCode, SessionId, VerificationOutcome,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use crate::metrics;
#[cfg(feature = "tracing")]
use tracing::{debug, info, warn};

/// Longest message body the service hands to a gateway, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 1600;

/// OTP service that works with any [`Gateway`] implementation.
///
/// This service handles:
/// - Per-destination rate limiting of code issuance
/// - Calling the gateway and normalizing its answers
/// - Keeping faults (`Provider`) apart from legitimate outcomes (`Rejected`)
///
/// The limiter is shared between clones, so a cloned service enforces the
/// same windows.
///
/// # Type Parameters
///
/// - `G`: The gateway implementation (e.g., `TwilioGateway`)
///
/// # Example
///
/// ```rust,ignore
/// use sms_otp::{Channel, Destination, OtpCode, OtpService, OtpServiceTrait};
/// use sms_otp::twilio::{TwilioGateway, TwilioSettings};
///
/// let gateway = TwilioGateway::from_settings(TwilioSettings::from_env()?)?;
/// let service = OtpService::with_gateway(gateway);
///
/// let destination = Destination::new("+15551230000")?;
/// let session = service.issue_otp(&destination, Channel::Sms).await?;
///
/// let outcome = service.verify_otp(&destination, &OtpCode::new("123456")?).await?;
/// println!("session {session}: approved = {}", outcome.is_approved());
/// ```
#[derive(Debug, Clone)]
pub struct OtpService<G: Gateway> {
    gateway: G,
    config: OtpServiceConfig,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl<G: Gateway> OtpService<G> {
    /// Create a new OTP service with a custom gateway and configuration.
    pub fn new(gateway: G, config: OtpServiceConfig) -> Result<Self, ConfigError> {
        Self::with_clock(gateway, config, Arc::new(SystemClock::new()))
    }

    /// Create a new OTP service with default configuration.
    pub fn with_gateway(gateway: G) -> Self {
        let config = OtpServiceConfig::default();
        let limiter = RateLimiter::with_capacity(config.min_interval, config.max_tracked_destinations);
        Self {
            gateway,
            config,
            limiter: Arc::new(limiter),
            clock: Arc::new(SystemClock::new()),
        }
    }

    fn with_clock(
        gateway: G,
        config: OtpServiceConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let limiter = RateLimiter::with_capacity(config.min_interval, config.max_tracked_destinations);
        Ok(Self {
            gateway,
            config,
            limiter: Arc::new(limiter),
            clock,
        })
    }

    /// Create a new builder for OtpService.
    pub fn builder(gateway: G) -> OtpServiceBuilder<G> {
        OtpServiceBuilder::new(gateway)
    }

    /// Get reference to the underlying gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Get reference to the service configuration.
    pub fn config(&self) -> &OtpServiceConfig {
        &self.config
    }

    /// Get reference to the rate limiter.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Prune expired rate-limit entries every `interval` until `token` is
    /// cancelled.
    pub fn spawn_pruner(&self, interval: Duration, token: CancellationToken) -> JoinHandle<()> {
        Arc::clone(&self.limiter).spawn_pruner(Arc::clone(&self.clock), interval, token)
    }

    /// Issue a code, giving up when `token` is cancelled.
    ///
    /// Cancellation before the gateway answers returns
    /// [`OtpServiceError::Cancelled`] and records nothing, so the
    /// destination is not throttled by the abandoned attempt.
    pub async fn issue_otp_cancellable(
        &self,
        destination: &Destination,
        channel: Channel,
        token: &CancellationToken,
    ) -> Result<SessionId, OtpServiceError> {
        self.issue(destination, channel, Some(token)).await
    }

    /// Check a code, giving up when `token` is cancelled.
    ///
    /// The provider may still have counted the attempt if the request
    /// reached it before cancellation.
    pub async fn verify_otp_cancellable(
        &self,
        destination: &Destination,
        code: &OtpCode,
        token: &CancellationToken,
    ) -> Result<CheckOutcome, OtpServiceError> {
        self.verify(destination, code, Some(token)).await
    }

    /// Look up a session, giving up when `token` is cancelled.
    pub async fn get_verification_status_cancellable(
        &self,
        session: &SessionId,
        token: &CancellationToken,
    ) -> Result<VerificationOutcome, OtpServiceError> {
        self.status(session, Some(token)).await
    }

    /// Send a message, giving up when `token` is cancelled.
    ///
    /// A cancelled send returns [`OtpServiceError::Cancelled`], but the
    /// message may already have been accepted by the provider.
    pub async fn send_message_cancellable(
        &self,
        destination: &Destination,
        body: &str,
        token: &CancellationToken,
    ) -> Result<Delivery, OtpServiceError> {
        self.send(destination, body, Some(token)).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "otp.issue",
            skip_all,
            fields(destination = %destination.masked(), channel = %channel, gateway = self.gateway.name())
        )
    )]
    async fn issue(
        &self,
        destination: &Destination,
        channel: Channel,
        token: Option<&CancellationToken>,
    ) -> Result<SessionId, OtpServiceError> {
        let reservation = match self.limiter.try_reserve(destination, self.clock.now()) {
            Ok(reservation) => reservation,
            Err(throttled) => {
                #[cfg(feature = "tracing")]
                info!(
                    retry_after_secs = %throttled.retry_after.as_secs_f64(),
                    in_flight = throttled.in_flight,
                    "Issuance throttled"
                );

                #[cfg(feature = "metrics")]
                metrics::record_throttled(throttled.in_flight);

                return Err(OtpServiceError::RateLimited {
                    destination: destination.clone(),
                    retry_after: throttled.retry_after,
                });
            }
        };

        let call = self.gateway.start_verification(destination, channel);
        match self.call_gateway(call, token).await {
            Ok(session) => {
                reservation.commit(self.clock.now());

                #[cfg(feature = "tracing")]
                info!(session_id = %session, "OTP issued");

                #[cfg(feature = "metrics")]
                metrics::record_issued(self.gateway.name(), "ok");

                Ok(session)
            }
            Err(error) => {
                drop(reservation);

                #[cfg(feature = "tracing")]
                warn!(error = %error, "OTP issuance failed, nothing recorded");

                #[cfg(feature = "metrics")]
                metrics::record_issued(self.gateway.name(), error.kind());

                Err(error)
            }
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "otp.verify",
            skip_all,
            fields(destination = %destination.masked(), gateway = self.gateway.name())
        )
    )]
    async fn verify(
        &self,
        destination: &Destination,
        code: &OtpCode,
        token: Option<&CancellationToken>,
    ) -> Result<CheckOutcome, OtpServiceError> {
        let call = self.gateway.check_verification(destination, code);
        let status = match self.call_gateway(call, token).await {
            Ok(status) => status,
            Err(error) => {
                #[cfg(feature = "tracing")]
                warn!(error = %error, "Verification check failed");

                #[cfg(feature = "metrics")]
                metrics::record_verify(self.gateway.name(), error.kind());

                return Err(error);
            }
        };

        let outcome = if status == self.config.approval_status {
            CheckOutcome::Approved
        } else {
            CheckOutcome::Rejected { status }
        };

        #[cfg(feature = "tracing")]
        info!(approved = outcome.is_approved(), "Verification checked");

        #[cfg(feature = "metrics")]
        metrics::record_verify(
            self.gateway.name(),
            if outcome.is_approved() { "approved" } else { "rejected" },
        );

        Ok(outcome)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "otp.status",
            skip_all,
            fields(session_id = %session, gateway = self.gateway.name())
        )
    )]
    async fn status(
        &self,
        session: &SessionId,
        token: Option<&CancellationToken>,
    ) -> Result<VerificationOutcome, OtpServiceError> {
        if session.as_str().trim().is_empty() {
            return Err(OtpServiceError::EmptySessionId);
        }

        let call = self.gateway.fetch_verification_status(session);
        let raw = self.call_gateway(call, token).await?;
        let outcome = VerificationOutcome::from_raw(&raw);

        #[cfg(feature = "tracing")]
        {
            if outcome == VerificationOutcome::Unknown {
                warn!(raw_status = %raw, "Unrecognized verification status");
            } else {
                debug!(outcome = %outcome, "Verification status fetched");
            }
        }

        Ok(outcome)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "otp.send_message",
            skip_all,
            fields(destination = %destination.masked(), gateway = self.gateway.name())
        )
    )]
    async fn send(
        &self,
        destination: &Destination,
        body: &str,
        token: Option<&CancellationToken>,
    ) -> Result<Delivery, OtpServiceError> {
        if body.trim().is_empty() {
            return Err(OtpServiceError::EmptyMessage);
        }
        let length = body.chars().count();
        if length > MAX_MESSAGE_LENGTH {
            return Err(OtpServiceError::MessageTooLong {
                length,
                max: MAX_MESSAGE_LENGTH,
            });
        }

        let call = self.gateway.send_message(destination, body);
        let receipt = match self.call_gateway(call, token).await {
            Ok(receipt) => receipt,
            Err(error) => {
                #[cfg(feature = "tracing")]
                warn!(error = %error, "Message send failed");

                #[cfg(feature = "metrics")]
                metrics::record_message(self.gateway.name(), error.kind());

                return Err(error);
            }
        };

        if let Some(code) = receipt.error_code {
            #[cfg(feature = "tracing")]
            warn!(
                message_id = %receipt.message_id,
                error_code = code,
                "Provider reported a delivery error"
            );

            #[cfg(feature = "metrics")]
            metrics::record_message(self.gateway.name(), "delivery_error");

            return Err(OtpServiceError::Delivery {
                code,
                message: receipt.error_message,
            });
        }

        #[cfg(feature = "tracing")]
        info!(message_id = %receipt.message_id, "Message accepted");

        #[cfg(feature = "metrics")]
        metrics::record_message(self.gateway.name(), "delivered");

        Ok(Delivery {
            message_id: receipt.message_id,
            status: receipt.status,
        })
    }

    /// Await a gateway call under the configured timeout and an optional
    /// cancellation token.
    async fn call_gateway<T: Send>(
        &self,
        call: impl Future<Output = Result<T, G::Error>> + Send,
        token: Option<&CancellationToken>,
    ) -> Result<T, OtpServiceError> {
        let bounded = async {
            let result = match self.config.gateway_timeout {
                Some(timeout) => match tokio::time::timeout(timeout, call).await {
                    Ok(result) => result,
                    Err(_) => return Err(OtpServiceError::Timeout { timeout }),
                },
                None => call.await,
            };
            result.map_err(OtpServiceError::provider)
        };

        match token {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(OtpServiceError::Cancelled),
                result = bounded => result,
            },
            None => bounded.await,
        }
    }
}

impl<G: Gateway> OtpServiceTrait for OtpService<G> {
    type Error = OtpServiceError;

    async fn issue_otp(
        &self,
        destination: &Destination,
        channel: Channel,
    ) -> Result<SessionId, Self::Error> {
        self.issue(destination, channel, None).await
    }

    async fn verify_otp(
        &self,
        destination: &Destination,
        code: &OtpCode,
    ) -> Result<CheckOutcome, Self::Error> {
        self.verify(destination, code, None).await
    }

    async fn get_verification_status(
        &self,
        session: &SessionId,
    ) -> Result<VerificationOutcome, Self::Error> {
        self.status(session, None).await
    }

    async fn send_message(&self, destination: &Destination, body: &str) -> Result<Delivery, Self::Error> {
        self.send(destination, body, None).await
    }
}

/// Builder for OtpService.
///
/// # Example
///
/// ```rust,ignore
/// use sms_otp::OtpService;
/// use std::time::Duration;
///
/// let service = OtpService::builder(gateway)
///     .min_interval(Duration::from_secs(30))
///     .gateway_timeout(Duration::from_secs(10))
///     .build()?;
/// ```
#[derive(Debug)]
pub struct OtpServiceBuilder<G: Gateway> {
    gateway: G,
    config_builder: OtpServiceConfigBuilder,
    clock: Option<Arc<dyn Clock>>,
}

impl<G: Gateway> OtpServiceBuilder<G> {
    /// Create a new builder with the given gateway.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            config_builder: OtpServiceConfigBuilder::default(),
            clock: None,
        }
    }

    /// Set the minimum re-issuance interval per destination.
    ///
    /// Default: 60 seconds
    pub fn min_interval(mut self, interval: Duration) -> Self {
        self.config_builder = self.config_builder.min_interval(interval);
        self
    }

    /// Set the raw status that counts as approval.
    ///
    /// Default: "approved"
    pub fn approval_status(mut self, status: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.approval_status(status);
        self
    }

    /// Set the timeout for a single gateway call.
    pub fn gateway_timeout(mut self, timeout: Duration) -> Self {
        self.config_builder = self.config_builder.gateway_timeout(timeout);
        self
    }

    /// Set the destination capacity of the rate limiter.
    pub fn max_tracked_destinations(mut self, max: usize) -> Self {
        self.config_builder = self.config_builder.max_tracked_destinations(max);
        self
    }

    /// Set the full configuration.
    pub fn config(mut self, config: OtpServiceConfig) -> Self {
        self.config_builder = OtpServiceConfigBuilder { config };
        self
    }

    /// Use a custom time source for rate limiting.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Validate the configuration and build the OtpService.
    pub fn build(self) -> Result<OtpService<G>, ConfigError> {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));
        OtpService::with_clock(self.gateway, self.config_builder.build(), clock)
    }
}
