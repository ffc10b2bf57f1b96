//! Error classification shared by gateways and the OTP service.

/// Trait for errors that can be classified as transient or permanent.
///
/// Gateways implement this so that callers (and the opt-in
/// [`RetryableGateway`](crate::RetryableGateway)) can decide whether
/// repeating a call makes sense. The OTP service itself never retries; it
/// only surfaces the classification on
/// [`OtpServiceError::Provider`](crate::OtpServiceError::Provider).
///
/// # Examples
///
/// ```rust
/// use sms_otp::RetryableError;
///
/// enum MyError {
///     NetworkTimeout,     // try again later
///     TooManyRequests,    // provider throttled us
///     InvalidCredentials, // won't work until fixed
/// }
///
/// impl RetryableError for MyError {
///     fn is_retryable(&self) -> bool {
///         matches!(self, MyError::NetworkTimeout | MyError::TooManyRequests)
///     }
/// }
///
/// assert!(MyError::NetworkTimeout.is_retryable());
/// assert!(!MyError::InvalidCredentials.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error represents a transient failure
    /// that might succeed if the same call is repeated.
    ///
    /// Examples: network timeouts, provider-side throttling (HTTP 429),
    /// temporary service unavailability (HTTP 5xx).
    fn is_retryable(&self) -> bool;

    /// Returns true if the error is caused by the input rather than by the
    /// provider or the network (unknown session, malformed destination).
    ///
    /// Default implementation returns false.
    fn is_client_error(&self) -> bool {
        false
    }
}
