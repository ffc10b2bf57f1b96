//! Resources returned by the Twilio Verify and Messaging APIs.

use crate::types::{MessageReceipt, SessionId};
use serde::{Deserialize, Serialize};

/// Verification resource (`/v2/Services/{VA}/Verifications`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResource {
    /// Verification SID ("VE..." for Verify v2, opaque to this crate).
    pub sid: SessionId,
    /// Raw status ("pending", "approved", "canceled", ...).
    pub status: String,
    /// Destination the code was sent to.
    pub to: Option<String>,
    /// Channel used ("sms", "call").
    pub channel: Option<String>,
    /// Whether the code was valid (only meaningful after a check).
    pub valid: Option<bool>,
}

/// Verification check resource (`/v2/Services/{VA}/VerificationCheck`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationCheckResource {
    /// SID of the verification that was checked.
    pub sid: Option<String>,
    /// Raw status after the check.
    pub status: String,
    /// Whether the submitted code matched.
    pub valid: Option<bool>,
    /// Destination of the verification.
    pub to: Option<String>,
}

/// Message resource (`/2010-04-01/Accounts/{AC}/Messages.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResource {
    /// Message SID ("SM...").
    pub sid: String,
    /// Raw status ("queued", "sent", "failed", ...).
    pub status: Option<String>,
    /// Delivery error code, `null` when there is none.
    pub error_code: Option<i64>,
    /// Delivery error description.
    pub error_message: Option<String>,
    /// Recipient.
    pub to: Option<String>,
}

impl From<MessageResource> for MessageReceipt {
    fn from(resource: MessageResource) -> Self {
        MessageReceipt {
            message_id: resource.sid,
            status: resource.status,
            error_code: resource.error_code,
            error_message: resource.error_message,
        }
    }
}
