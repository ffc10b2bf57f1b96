//! Communications gateways.

pub(crate) mod retryable;
pub(crate) mod traits;

#[cfg(feature = "twilio")]
pub mod twilio;

pub use retryable::{OnRetryCallback, RetryableGateway};
pub use traits::Gateway;
