//! Retryable gateway wrapper.

use super::traits::Gateway;
use crate::errors::RetryableError;
use crate::types::{Channel, Destination, MessageReceipt, OtpCode, SessionId};
use crate::utils::retry::RetryConfig;
use backon::Retryable;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Callback type for retry notifications.
///
/// Receives the error that caused the retry and the delay before the next
/// attempt.
pub type OnRetryCallback<E> = Arc<dyn Fn(&E, Duration) + Send + Sync>;

/// Wrapper that adds retry logic to any [`Gateway`].
///
/// Retrying is the caller's choice: wrap the gateway before handing it to
/// the service if you want it. Only idempotent reads are retried.
/// `start_verification` and `send_message` would deliver a second code or
/// message, and every `check_verification` call consumes one of the
/// provider's attempts, so those pass straight through.
///
/// # Example
///
/// ```rust,ignore
/// use sms_otp::{RetryConfig, RetryableGateway};
/// use sms_otp::twilio::{TwilioGateway, TwilioSettings};
/// use std::time::Duration;
///
/// let gateway = TwilioGateway::from_settings(TwilioSettings::from_env()?)?;
/// let gateway = RetryableGateway::with_config(
///     gateway,
///     RetryConfig::default().with_max_retries(5),
/// )
/// .with_on_retry(|error, delay| eprintln!("retrying in {delay:?}: {error}"));
/// ```
pub struct RetryableGateway<G: Gateway> {
    inner: Arc<G>,
    retry_config: RetryConfig,
    on_retry: Option<OnRetryCallback<G::Error>>,
}

impl<G: Gateway> Clone for RetryableGateway<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            retry_config: self.retry_config.clone(),
            on_retry: self.on_retry.clone(),
        }
    }
}

impl<G: Gateway + Debug> Debug for RetryableGateway<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryableGateway")
            .field("inner", &self.inner)
            .field("retry_config", &self.retry_config)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "..."))
            .finish()
    }
}

impl<G: Gateway> RetryableGateway<G> {
    /// Wrap a gateway with default retry logic.
    pub fn new(inner: G) -> Self {
        Self::with_config(inner, RetryConfig::default())
    }

    /// Wrap a gateway with custom retry configuration.
    pub fn with_config(inner: G, retry_config: RetryConfig) -> Self {
        Self {
            inner: Arc::new(inner),
            retry_config,
            on_retry: None,
        }
    }

    /// Set a callback to be invoked on each retry attempt.
    pub fn with_on_retry<F>(mut self, callback: F) -> Self
    where
        F: Fn(&G::Error, Duration) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(callback));
        self
    }

    /// Get reference to the inner gateway.
    pub fn inner(&self) -> &G {
        &self.inner
    }

    /// Get reference to the retry configuration.
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }
}

impl<G: Gateway> Gateway for RetryableGateway<G>
where
    G::Error: Debug,
{
    type Error = G::Error;

    async fn start_verification(
        &self,
        to: &Destination,
        channel: Channel,
    ) -> Result<SessionId, Self::Error> {
        self.inner.start_verification(to, channel).await
    }

    async fn check_verification(
        &self,
        to: &Destination,
        code: &OtpCode,
    ) -> Result<String, Self::Error> {
        self.inner.check_verification(to, code).await
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "RetryableGateway::fetch_verification_status",
            skip_all,
            fields(session_id = %session)
        )
    )]
    async fn fetch_verification_status(&self, session: &SessionId) -> Result<String, Self::Error> {
        let inner = Arc::clone(&self.inner);
        let session_owned = session.clone();
        let on_retry = self.on_retry.clone();
        (|| {
            let inner = Arc::clone(&inner);
            let session = session_owned.clone();
            async move { inner.fetch_verification_status(&session).await }
        })
        .retry(self.retry_config.build_strategy())
        .when(|err: &Self::Error| err.is_retryable())
        .notify(move |err, duration| {
            if let Some(ref callback) = on_retry {
                callback(err, duration);
            }

            #[cfg(feature = "tracing")]
            debug!(
                error = ?err,
                retry_after_secs = %duration.as_secs_f64(),
                "Retrying fetch_verification_status"
            );
        })
        .await
    }

    async fn send_message(
        &self,
        to: &Destination,
        body: &str,
    ) -> Result<MessageReceipt, Self::Error> {
        self.inner.send_message(to, body).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use thiserror::Error;

    #[derive(Debug, Error)]
    enum FlakyError {
        #[error("temporarily unavailable")]
        Unavailable,
        #[error("session not found")]
        NotFound,
    }

    impl RetryableError for FlakyError {
        fn is_retryable(&self) -> bool {
            matches!(self, FlakyError::Unavailable)
        }
    }

    /// Fails `failures` times with `error`, then succeeds.
    #[derive(Clone)]
    struct FlakyGateway {
        calls: Arc<AtomicUsize>,
        failures: usize,
        permanent: bool,
    }

    impl FlakyGateway {
        fn new(failures: usize, permanent: bool) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                failures,
                permanent,
            }
        }

        fn fail_or(&self) -> Result<(), FlakyError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(if self.permanent {
                    FlakyError::NotFound
                } else {
                    FlakyError::Unavailable
                });
            }
            Ok(())
        }
    }

    impl Gateway for FlakyGateway {
        type Error = FlakyError;

        async fn start_verification(
            &self,
            _to: &Destination,
            _channel: Channel,
        ) -> Result<SessionId, FlakyError> {
            self.fail_or().map(|_| SessionId::from("VA001"))
        }

        async fn check_verification(
            &self,
            _to: &Destination,
            _code: &OtpCode,
        ) -> Result<String, FlakyError> {
            self.fail_or().map(|_| "approved".to_string())
        }

        async fn fetch_verification_status(
            &self,
            _session: &SessionId,
        ) -> Result<String, FlakyError> {
            self.fail_or().map(|_| "pending".to_string())
        }

        async fn send_message(
            &self,
            _to: &Destination,
            _body: &str,
        ) -> Result<MessageReceipt, FlakyError> {
            self.fail_or().map(|_| MessageReceipt {
                message_id: "SM001".to_string(),
                status: None,
                error_code: None,
                error_message: None,
            })
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig::default()
            .with_min_delay(Duration::from_millis(1))
            .with_max_delay(Duration::from_millis(5))
            .with_max_retries(3)
    }

    #[tokio::test]
    async fn test_fetch_status_retries_transient_errors() {
        let inner = FlakyGateway::new(2, false);
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&notified);
        let gateway = RetryableGateway::with_config(inner.clone(), fast_config())
            .with_on_retry(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let status = gateway
            .fetch_verification_status(&SessionId::from("VA001"))
            .await
            .unwrap();

        assert_eq!(status, "pending");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_status_does_not_retry_permanent_errors() {
        let inner = FlakyGateway::new(1, true);
        let gateway = RetryableGateway::with_config(inner.clone(), fast_config());

        let result = gateway
            .fetch_verification_status(&SessionId::from("VA404"))
            .await;

        assert!(matches!(result, Err(FlakyError::NotFound)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_start_verification_is_never_retried() {
        let inner = FlakyGateway::new(1, false);
        let gateway = RetryableGateway::with_config(inner.clone(), fast_config());
        let to = Destination::new("+15551230000").unwrap();

        let result = gateway.start_verification(&to, Channel::Sms).await;

        assert!(matches!(result, Err(FlakyError::Unavailable)));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_message_is_never_retried() {
        let inner = FlakyGateway::new(1, false);
        let gateway = RetryableGateway::with_config(inner.clone(), fast_config());
        let to = Destination::new("+15551230000").unwrap();

        assert!(gateway.send_message(&to, "hello").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }
}
