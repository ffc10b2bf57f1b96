//! Service-level error types.

use crate::errors::RetryableError;
use crate::types::Destination;
use std::error::Error as StdError;
use std::time::Duration;
use thiserror::Error;

/// Errors returned by the OTP service.
///
/// A rejected code is not an error; it is reported as
/// [`CheckOutcome::Rejected`](crate::CheckOutcome::Rejected).
#[derive(Debug, Error)]
pub enum OtpServiceError {
    /// A code was issued to this destination too recently, or another
    /// issuance for it is still in progress. No provider call was made.
    #[error("Destination {} is rate limited, retry in {:.1}s", destination.masked(), retry_after.as_secs_f64())]
    RateLimited {
        /// The throttled destination.
        destination: Destination,
        /// Time until a new issuance may succeed.
        retry_after: Duration,
    },

    /// The gateway call failed.
    #[error("Provider error: {source}")]
    Provider {
        #[source]
        source: Box<dyn StdError + Send + Sync>,
        /// Whether repeating the same call could succeed.
        is_retryable: bool,
    },

    /// The provider accepted the message call but reported a delivery error.
    #[error("Provider reported delivery error {code}: {}", message.as_deref().unwrap_or("no details"))]
    Delivery {
        /// Provider error code.
        code: i64,
        /// Provider error description.
        message: Option<String>,
    },

    /// The caller cancelled the operation before the gateway answered.
    #[error("Operation cancelled")]
    Cancelled,

    /// The gateway did not answer within the configured timeout.
    #[error("Gateway call timed out after {:.1}s", timeout.as_secs_f64())]
    Timeout {
        /// Configured timeout.
        timeout: Duration,
    },

    /// Session id is empty or blank. No provider call was made.
    #[error("Session id cannot be empty")]
    EmptySessionId,

    /// Message body is empty.
    #[error("Message body cannot be empty")]
    EmptyMessage,

    /// Message body exceeds the provider limit.
    #[error("Message body is {length} characters, limit is {max}")]
    MessageTooLong {
        /// Length of the body in characters.
        length: usize,
        /// Maximum allowed length.
        max: usize,
    },
}

impl OtpServiceError {
    pub(crate) fn provider<E>(error: E) -> Self
    where
        E: StdError + RetryableError + Send + Sync + 'static,
    {
        let is_retryable = error.is_retryable();
        Self::Provider {
            source: Box::new(error),
            is_retryable,
        }
    }

    /// Whether the failure originated at the gateway: a call fault, a
    /// reported delivery error, or a gateway call that timed out.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::Delivery { .. } | Self::Timeout { .. }
        )
    }

    /// Short snake_case name of the variant, used as a metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Provider { .. } => "provider_error",
            Self::Delivery { .. } => "delivery_error",
            Self::Cancelled => "cancelled",
            Self::Timeout { .. } => "timeout",
            Self::EmptySessionId => "empty_session_id",
            Self::EmptyMessage => "empty_message",
            Self::MessageTooLong { .. } => "message_too_long",
        }
    }

    /// Whether the issuance was refused by the rate limiter.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Time to wait before issuing again, for rate-limited errors.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl RetryableError for OtpServiceError {
    fn is_retryable(&self) -> bool {
        match self {
            OtpServiceError::Provider { is_retryable, .. } => *is_retryable,
            OtpServiceError::Timeout { .. } => true,
            OtpServiceError::RateLimited { .. }
            | OtpServiceError::Delivery { .. }
            | OtpServiceError::Cancelled
            | OtpServiceError::EmptySessionId
            | OtpServiceError::EmptyMessage
            | OtpServiceError::MessageTooLong { .. } => false,
        }
    }

    fn is_client_error(&self) -> bool {
        matches!(
            self,
            OtpServiceError::EmptySessionId
                | OtpServiceError::EmptyMessage
                | OtpServiceError::MessageTooLong { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Flaky(bool);

    impl fmt::Display for Flaky {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "flaky({})", self.0)
        }
    }

    impl StdError for Flaky {}

    impl RetryableError for Flaky {
        fn is_retryable(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_provider_keeps_classification() {
        let error = OtpServiceError::provider(Flaky(true));
        assert!(error.is_retryable());
        assert!(error.is_provider_error());
        assert_eq!(error.to_string(), "Provider error: flaky(true)");

        let error = OtpServiceError::provider(Flaky(false));
        assert!(!error.is_retryable());
        assert!(error.source().is_some());
    }

    #[test]
    fn test_delivery_is_provider_error() {
        let error = OtpServiceError::Delivery {
            code: 30003,
            message: Some("Unreachable destination handset".to_string()),
        };
        assert!(error.is_provider_error());
        assert!(!error.is_rate_limited());
        assert_eq!(
            error.to_string(),
            "Provider reported delivery error 30003: Unreachable destination handset"
        );
    }

    #[test]
    fn test_rate_limited_masks_destination() {
        let error = OtpServiceError::RateLimited {
            destination: Destination::new("+15551230000").unwrap(),
            retry_after: Duration::from_secs(30),
        };
        assert!(error.is_rate_limited());
        assert!(!error.is_provider_error());
        assert_eq!(error.retry_after(), Some(Duration::from_secs(30)));
        assert!(!error.to_string().contains("5551230000"));
    }

    #[test]
    fn test_client_errors() {
        assert!(OtpServiceError::EmptyMessage.is_client_error());
        assert!(OtpServiceError::EmptySessionId.is_client_error());
        assert!(!OtpServiceError::EmptySessionId.is_provider_error());
        assert!(
            OtpServiceError::MessageTooLong {
                length: 1601,
                max: 1600
            }
            .is_client_error()
        );
        assert!(!OtpServiceError::Cancelled.is_client_error());
        assert!(!OtpServiceError::Cancelled.is_retryable());
    }
}
