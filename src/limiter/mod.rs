//! Per-destination rate limiting for OTP issuance.

pub(crate) mod clock;
pub(crate) mod rate_limiter;

pub use clock::{Clock, SystemClock};
pub use rate_limiter::{
    DEFAULT_MAX_ENTRIES, DEFAULT_MIN_INTERVAL, IssuanceReservation, RateLimiter, Throttled,
};

#[cfg(any(test, feature = "test-helpers"))]
pub use clock::MockClock;
