//! Error types for the Twilio gateway.

use crate::errors::RetryableError;
use crate::types::DestinationError;
use serde::Deserialize;
use std::fmt::{self, Display, Formatter};
use thiserror::Error;

/// Twilio error codes this crate reacts to.
///
/// See <https://www.twilio.com/docs/api/errors> for the full list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwilioErrorCode {
    // === Transient (retryable) ===
    /// Too many requests (20429).
    TooManyRequests,
    /// Internal service error (20500).
    InternalError,
    /// Service unavailable (20503).
    ServiceUnavailable,

    // === Permanent ===
    /// Authentication failed (20003).
    AuthenticationFailed,
    /// Requested resource not found, e.g. unknown session (20404).
    NotFound,
    /// Invalid parameter (60200).
    InvalidParameter,
    /// Max check attempts reached (60202).
    MaxCheckAttempts,
    /// Max send attempts reached (60203).
    MaxSendAttempts,
    /// Channel not supported for this number, e.g. SMS to a landline (60205).
    ChannelNotSupported,
    /// Delivery attempt blocked by fraud guard (60410).
    DeliveryBlocked,
    /// The 'To' number is not valid (21211).
    InvalidToNumber,
    /// Account not permitted to message this region (21408).
    RegionNotPermitted,
    /// Recipient unsubscribed (21610).
    Unsubscribed,
    /// Recipient is not a mobile number (21614).
    NotMobile,

    /// Any other code.
    Other(i64),
}

impl TwilioErrorCode {
    /// Map a numeric Twilio code.
    pub fn from_code(code: i64) -> Self {
        match code {
            20429 => Self::TooManyRequests,
            20500 => Self::InternalError,
            20503 => Self::ServiceUnavailable,
            20003 => Self::AuthenticationFailed,
            20404 => Self::NotFound,
            60200 => Self::InvalidParameter,
            60202 => Self::MaxCheckAttempts,
            60203 => Self::MaxSendAttempts,
            60205 => Self::ChannelNotSupported,
            60410 => Self::DeliveryBlocked,
            21211 => Self::InvalidToNumber,
            21408 => Self::RegionNotPermitted,
            21610 => Self::Unsubscribed,
            21614 => Self::NotMobile,
            other => Self::Other(other),
        }
    }

    /// Numeric code.
    pub fn code(&self) -> i64 {
        match self {
            Self::TooManyRequests => 20429,
            Self::InternalError => 20500,
            Self::ServiceUnavailable => 20503,
            Self::AuthenticationFailed => 20003,
            Self::NotFound => 20404,
            Self::InvalidParameter => 60200,
            Self::MaxCheckAttempts => 60202,
            Self::MaxSendAttempts => 60203,
            Self::ChannelNotSupported => 60205,
            Self::DeliveryBlocked => 60410,
            Self::InvalidToNumber => 21211,
            Self::RegionNotPermitted => 21408,
            Self::Unsubscribed => 21610,
            Self::NotMobile => 21614,
            Self::Other(code) => *code,
        }
    }

    /// Returns true if this error is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::TooManyRequests | Self::InternalError | Self::ServiceUnavailable
        )
    }
}

/// Error body Twilio returns with non-2xx responses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TwilioApiError {
    /// Twilio error code, if present.
    pub code: Option<i64>,
    /// Human-readable message.
    pub message: String,
    /// Link to the error documentation.
    pub more_info: Option<String>,
    /// HTTP status.
    pub status: u16,
}

impl TwilioApiError {
    /// Classified error code.
    pub fn error_code(&self) -> Option<TwilioErrorCode> {
        self.code.map(TwilioErrorCode::from_code)
    }

    /// Whether a repeat of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        self.status == 429
            || self.status >= 500
            || self.error_code().is_some_and(|c| c.is_retryable())
    }
}

impl Display for TwilioApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "HTTP {} (code {}): {}", self.status, code, self.message),
            None => write!(f, "HTTP {}: {}", self.status, self.message),
        }
    }
}

/// Invalid or incomplete Twilio settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Environment variable not set.
    #[error("environment variable {0} is not set")]
    MissingVar(&'static str),
    /// Field is empty.
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    /// Account SID does not start with "AC".
    #[error("account SID must start with 'AC'")]
    InvalidAccountSid,
    /// Verify service SID does not start with "VA".
    #[error("verify service SID must start with 'VA'")]
    InvalidServiceSid,
    /// Sender number is not E.164.
    #[error("sender number is invalid: {0}")]
    InvalidFromNumber(#[source] DestinationError),
}

/// Twilio gateway errors.
#[derive(Debug, Error)]
pub enum TwilioError {
    /// Failed to build the HTTP client.
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// Base URL could not be parsed or joined.
    #[error("Invalid endpoint '{url}': {source}")]
    InvalidEndpoint {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Session id is not a Twilio SID and would not map to a single path segment.
    #[error("Invalid session id '{0}'")]
    InvalidSessionId(String),

    /// Failed to encode the request form.
    #[error("Failed to encode request form: {0}")]
    EncodeForm(#[source] serde_urlencoded::ser::Error),

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[source] reqwest_middleware::Error),

    /// Failed to read the response body.
    #[error("Failed to read response body: {0}")]
    ReadResponse(#[source] reqwest::Error),

    /// Twilio rejected the request.
    #[error("Twilio API error: {0}")]
    Api(TwilioApiError),

    /// Failed to deserialize a success response.
    #[error("Failed to deserialize JSON response: {0}")]
    DeserializeJson(#[source] serde_json::Error),

    /// Settings are invalid.
    #[error("Invalid Twilio settings: {0}")]
    Settings(#[from] SettingsError),
}

pub type Result<T> = std::result::Result<T, TwilioError>;

impl RetryableError for TwilioError {
    fn is_retryable(&self) -> bool {
        match self {
            TwilioError::HttpRequest(_) => true,
            TwilioError::Api(error) => error.is_retryable(),
            TwilioError::BuildHttpClient(_)
            | TwilioError::InvalidEndpoint { .. }
            | TwilioError::InvalidSessionId(_)
            | TwilioError::EncodeForm(_)
            | TwilioError::ReadResponse(_)
            | TwilioError::DeserializeJson(_)
            | TwilioError::Settings(_) => false,
        }
    }

    fn is_client_error(&self) -> bool {
        match self {
            TwilioError::Api(error) => {
                (400..500).contains(&error.status) && !matches!(error.status, 401 | 403 | 429)
            }
            TwilioError::InvalidSessionId(_) => true,
            _ => false,
        }
    }
}
