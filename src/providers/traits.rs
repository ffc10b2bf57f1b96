//! Gateway trait definition.

use crate::errors::RetryableError;
use crate::types::{Channel, Destination, MessageReceipt, OtpCode, SessionId};
use std::error::Error as StdError;
use std::future::Future;

/// Capability set every communications provider must expose.
///
/// The OTP service depends only on this contract, so any provider (or a
/// fake in tests) can stand behind it.
///
/// # Type Parameters
///
/// - `Error`: The error type for provider faults (network, auth, rejected input)
///
/// # Note on async methods
///
/// All async methods in this trait return `Send` futures, making them
/// compatible with multi-threaded executors.
///
/// # Example
///
/// ```rust,ignore
/// use sms_otp::{Gateway, Channel, Destination, MessageReceipt, OtpCode, SessionId};
///
/// #[derive(Clone)]
/// struct MyGateway { /* ... */ }
///
/// impl Gateway for MyGateway {
///     type Error = MyError;
///
///     async fn start_verification(&self, to: &Destination, channel: Channel) -> Result<SessionId, Self::Error> {
///         // Ask the provider to send a code
///     }
///
///     async fn check_verification(&self, to: &Destination, code: &OtpCode) -> Result<String, Self::Error> {
///         // Submit the code, return the raw status
///     }
///
///     async fn fetch_verification_status(&self, session: &SessionId) -> Result<String, Self::Error> {
///         // Look up the session, return the raw status
///     }
///
///     async fn send_message(&self, to: &Destination, body: &str) -> Result<MessageReceipt, Self::Error> {
///         // Send a plain text message
///     }
/// }
/// ```
pub trait Gateway: Send + Sync + Clone {
    /// Error type returned by gateway operations.
    type Error: StdError + RetryableError + Send + Sync + 'static;

    /// Start a verification: the provider generates a code and delivers it
    /// over `channel`.
    ///
    /// # Returns
    /// * The provider-assigned session identifier
    fn start_verification(
        &self,
        to: &Destination,
        channel: Channel,
    ) -> impl Future<Output = Result<SessionId, Self::Error>> + Send;

    /// Submit a code for the pending verification of `to`.
    ///
    /// # Returns
    /// * The raw status string the provider reports after the check
    fn check_verification(
        &self,
        to: &Destination,
        code: &OtpCode,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Fetch the current raw status of a verification session.
    fn fetch_verification_status(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Send a one-off text message.
    ///
    /// A receipt with `error_code` set means the provider accepted the call
    /// but reported a delivery error.
    fn send_message(
        &self,
        to: &Destination,
        body: &str,
    ) -> impl Future<Output = Result<MessageReceipt, Self::Error>> + Send;

    /// Short provider name for logs.
    ///
    /// Default implementation returns "gateway".
    fn name(&self) -> &'static str {
        "gateway"
    }
}
