//! Service trait definition.

use crate::errors::RetryableError;
use crate::types::{
    Channel, CheckOutcome, Delivery, Destination, OtpCode, SessionId, VerificationOutcome,
};
use std::error::Error as StdError;
use std::future::Future;

/// Trait for OTP service implementations.
///
/// Lets callers depend on the operations rather than on a concrete
/// gateway-parameterized service.
pub trait OtpServiceTrait: Send + Sync {
    /// The error type for this service.
    type Error: StdError + RetryableError;

    /// Issue a code to `destination` over `channel`.
    ///
    /// # Returns
    ///
    /// The provider session identifier. Refused with a rate-limit error when
    /// the destination was issued a code within the configured window.
    fn issue_otp(
        &self,
        destination: &Destination,
        channel: Channel,
    ) -> impl Future<Output = Result<SessionId, Self::Error>> + Send;

    /// Check a code submitted for `destination`.
    ///
    /// A wrong or expired code yields [`CheckOutcome::Rejected`], not an
    /// error.
    fn verify_otp(
        &self,
        destination: &Destination,
        code: &OtpCode,
    ) -> impl Future<Output = Result<CheckOutcome, Self::Error>> + Send;

    /// Look up the normalized state of a verification session.
    fn get_verification_status(
        &self,
        session: &SessionId,
    ) -> impl Future<Output = Result<VerificationOutcome, Self::Error>> + Send;

    /// Send a one-off text message.
    fn send_message(
        &self,
        destination: &Destination,
        body: &str,
    ) -> impl Future<Output = Result<Delivery, Self::Error>> + Send;
}
