//! Core types for OTP issuance and verification.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// Destination
// =============================================================================

/// Error when parsing a destination.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DestinationError {
    /// Destination is empty after trimming.
    #[error("destination cannot be empty")]
    Empty,
    /// Destination is not an E.164 phone number.
    #[error("destination '{0}' is not an E.164 phone number")]
    InvalidFormat(String),
}

/// `+`, a non-zero leading digit, 7 to 15 digits in total.
static E164: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[1-9][0-9]{6,14}$").unwrap());

const SEPARATORS: &[char] = &[' ', '-', '(', ')', '.'];

/// Normalized target of a verification or message (E.164 phone number).
///
/// Formatting separators are stripped on construction, so
/// `"+1 (555) 123-0000"` and `"+15551230000"` are the same destination.
///
/// # Example
///
/// ```rust
/// use sms_otp::Destination;
///
/// let d = Destination::new("+1 (555) 123-0000").unwrap();
/// assert_eq!(d.as_str(), "+15551230000");
/// assert_eq!(d.masked(), "+*******0000");
///
/// assert!(Destination::new("").is_err());
/// assert!(Destination::new("5551230000").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Destination(String);

impl Destination {
    /// Create a new Destination from a string.
    pub fn new(s: impl AsRef<str>) -> Result<Self, DestinationError> {
        let trimmed = s.as_ref().trim();
        if trimmed.is_empty() {
            return Err(DestinationError::Empty);
        }
        let normalized: String = trimmed.chars().filter(|c| !SEPARATORS.contains(c)).collect();
        if !E164.is_match(&normalized) {
            return Err(DestinationError::InvalidFormat(trimmed.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Get the destination as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Destination with everything but the last four digits hidden, for logs.
    pub fn masked(&self) -> String {
        let digits = self.0.len() - 1;
        let visible = digits.min(4);
        let hidden = digits - visible;
        format!("+{}{}", "*".repeat(hidden), &self.0[1 + hidden..])
    }
}

impl FromStr for Destination {
    type Err = DestinationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for Destination {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Destination {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Destination {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Destination::new(raw).map_err(de::Error::custom)
    }
}

impl Serialize for Destination {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0)
    }
}

// =============================================================================
// SessionId
// =============================================================================

/// Provider-assigned identifier of a verification session.
///
/// The provider is the source of truth for the session; this crate only
/// hands the identifier back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new SessionId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// =============================================================================
// OtpCode
// =============================================================================

/// Error when parsing an OTP code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpCodeError {
    /// Code is empty after trimming.
    #[error("OTP code cannot be empty")]
    Empty,
}

/// Code submitted by the user for verification.
///
/// The `Debug` representation is redacted so codes don't end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Create a new OtpCode.
    pub fn new(code: impl AsRef<str>) -> Result<Self, OtpCodeError> {
        let code = code.as_ref().trim();
        if code.is_empty() {
            return Err(OtpCodeError::Empty);
        }
        Ok(Self(code.to_string()))
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode([REDACTED])")
    }
}

impl FromStr for OtpCode {
    type Err = OtpCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for OtpCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Channel
// =============================================================================

/// Error when parsing a channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown delivery channel '{0}', expected 'sms' or 'voice'")]
pub struct ChannelError(pub String);

/// Delivery mode for an OTP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Text message.
    #[default]
    Sms,
    /// Voice call reading out the code.
    Voice,
}

impl Channel {
    /// Channel name as understood by the verification API.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::Voice => "call",
        }
    }
}

impl FromStr for Channel {
    type Err = ChannelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "voice" | "call" => Ok(Channel::Voice),
            _ => Err(ChannelError(s.to_string())),
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Voice => write!(f, "voice"),
        }
    }
}

// =============================================================================
// VerificationOutcome
// =============================================================================

/// Normalized state of a verification session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationOutcome {
    /// The code was confirmed.
    Approved,
    /// The session ended without approval (cancelled, failed, too many attempts).
    Rejected,
    /// Waiting for the user to submit the code.
    Pending,
    /// The session timed out at the provider.
    Expired,
    /// Status string not recognized.
    Unknown,
}

impl VerificationOutcome {
    /// Normalize a raw provider status string.
    ///
    /// Total: unrecognized input maps to [`VerificationOutcome::Unknown`].
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approved" => Self::Approved,
            "pending" => Self::Pending,
            "expired" => Self::Expired,
            "canceled" | "cancelled" | "failed" | "max_attempts_reached" | "deleted" => {
                Self::Rejected
            }
            _ => Self::Unknown,
        }
    }

    /// Whether the provider will not change this state anymore.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Expired)
    }
}

impl Display for VerificationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Pending => "pending",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

// =============================================================================
// CheckOutcome
// =============================================================================

/// Result of a well-formed code check.
///
/// `Rejected` is a valid answer (wrong or expired code), not a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// The provider approved the code.
    Approved,
    /// The provider did not approve the code.
    Rejected {
        /// Raw status the provider reported.
        status: String,
    },
}

impl CheckOutcome {
    /// Returns true for [`CheckOutcome::Approved`].
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

// =============================================================================
// MessageReceipt / Delivery
// =============================================================================

/// What a gateway reports after handing a message to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageReceipt {
    /// Provider message identifier.
    pub message_id: String,
    /// Raw provider status (e.g. "queued").
    pub status: Option<String>,
    /// Delivery error code, if the provider reported one.
    pub error_code: Option<i64>,
    /// Delivery error description, if any.
    pub error_message: Option<String>,
}

/// Confirmation that the provider accepted a message.
///
/// Acceptance is not end-device receipt; delivery continues asynchronously
/// at the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Provider message identifier.
    pub message_id: String,
    /// Raw provider status at acceptance time.
    pub status: Option<String>,
}
