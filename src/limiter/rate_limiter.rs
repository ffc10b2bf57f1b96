//! Per-destination issuance throttle.

use super::clock::Clock;
use crate::types::Destination;
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Default minimum interval between two issuances to the same destination.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of destinations tracked before stale entries are pruned.
pub const DEFAULT_MAX_ENTRIES: usize = 100_000;

/// Capacity-triggered pruning runs at most once per `min_interval / 4`.
const PRUNE_COOLDOWN_DIVISOR: u32 = 4;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    last_issued: Option<Instant>,
    in_flight: bool,
}

impl Slot {
    fn remaining(&self, now: Instant, min_interval: Duration) -> Option<Duration> {
        let last = self.last_issued?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < min_interval).then(|| min_interval - elapsed)
    }
}

/// Why a reservation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttled {
    /// Time until a new issuance can be attempted.
    pub retry_after: Duration,
    /// Another issuance for the destination is still waiting on the provider.
    pub in_flight: bool,
}

/// Tracks the last issuance time per destination and enforces a minimum
/// re-issuance interval.
///
/// State lives in a sharded [`DashMap`], so calls for different destinations
/// do not contend. For a single destination, [`RateLimiter::try_reserve`]
/// makes check-then-record atomic: only one issuance can be in flight and
/// the timestamp is written only when the reservation is committed.
///
/// # Example
///
/// ```rust
/// use sms_otp::Destination;
/// use sms_otp::limiter::RateLimiter;
/// use std::time::{Duration, Instant};
///
/// let limiter = RateLimiter::new(Duration::from_secs(60));
/// let dest = Destination::new("+15551230000").unwrap();
/// let t0 = Instant::now();
///
/// assert!(!limiter.should_throttle(&dest, t0));
/// limiter.record_issuance(&dest, t0);
/// assert!(limiter.should_throttle(&dest, t0 + Duration::from_secs(30)));
/// assert!(!limiter.should_throttle(&dest, t0 + Duration::from_secs(60)));
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<Destination, Slot>,
    min_interval: Duration,
    max_entries: usize,
    last_capacity_prune: Mutex<Option<Instant>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    /// Create a limiter with the given minimum interval.
    pub fn new(min_interval: Duration) -> Self {
        Self::with_capacity(min_interval, DEFAULT_MAX_ENTRIES)
    }

    /// Create a limiter that prunes stale entries once more than
    /// `max_entries` destinations are tracked.
    pub fn with_capacity(min_interval: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            min_interval,
            max_entries,
            last_capacity_prune: Mutex::new(None),
        }
    }

    /// Minimum interval between issuances to one destination.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Entry count that triggers pruning.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Number of tracked destinations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no destination is tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True iff an issuance was recorded for `destination` less than
    /// `min_interval` before `now`.
    pub fn should_throttle(&self, destination: &Destination, now: Instant) -> bool {
        self.retry_after(destination, now).is_some()
    }

    /// Remaining throttle window for `destination`, if any.
    pub fn retry_after(&self, destination: &Destination, now: Instant) -> Option<Duration> {
        self.entries
            .get(destination)
            .and_then(|slot| slot.remaining(now, self.min_interval))
    }

    /// Record an issuance, overwriting any previous timestamp.
    pub fn record_issuance(&self, destination: &Destination, now: Instant) {
        self.entries
            .entry(destination.clone())
            .or_default()
            .last_issued = Some(now);
        self.prune_if_over_capacity(now);
    }

    /// Atomically check the throttle and claim the destination for one
    /// issuance.
    ///
    /// Fails if the destination is inside its window or another issuance
    /// for it has not finished. The returned guard records the issuance on
    /// [`IssuanceReservation::commit`]; dropping it uncommitted leaves the
    /// recorded timestamp untouched.
    pub fn try_reserve(
        &self,
        destination: &Destination,
        now: Instant,
    ) -> Result<IssuanceReservation<'_>, Throttled> {
        {
            let mut slot = self.entries.entry(destination.clone()).or_default();
            if slot.in_flight {
                return Err(Throttled {
                    retry_after: self.min_interval,
                    in_flight: true,
                });
            }
            if let Some(retry_after) = slot.remaining(now, self.min_interval) {
                return Err(Throttled {
                    retry_after,
                    in_flight: false,
                });
            }
            slot.in_flight = true;
        }

        self.prune_if_over_capacity(now);

        Ok(IssuanceReservation {
            limiter: self,
            destination: destination.clone(),
            committed: false,
        })
    }

    fn release(&self, destination: &Destination) {
        if let Some(mut slot) = self.entries.get_mut(destination) {
            slot.in_flight = false;
        }
        self.entries
            .remove_if(destination, |_, slot| !slot.in_flight && slot.last_issued.is_none());
    }

    fn commit(&self, destination: &Destination, now: Instant) {
        let mut slot = self.entries.entry(destination.clone()).or_default();
        slot.last_issued = Some(now);
        slot.in_flight = false;
    }

    /// Drop entries whose window has elapsed and that have no issuance in
    /// flight. Returns the number of removed entries.
    pub fn prune(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, slot| slot.in_flight || slot.remaining(now, self.min_interval).is_some());
        let removed = before.saturating_sub(self.entries.len());

        #[cfg(feature = "tracing")]
        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Pruned stale rate-limit entries");
        }

        removed
    }

    /// Prune when over capacity, at most once per cooldown. A caller that
    /// finds another prune running, or one that ran recently, skips it so
    /// unrelated destinations do not queue behind a full-map sweep.
    fn prune_if_over_capacity(&self, now: Instant) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        let Ok(mut last) = self.last_capacity_prune.try_lock() else {
            return;
        };
        let cooldown = self.min_interval / PRUNE_COOLDOWN_DIVISOR;
        if last.is_some_and(|at| now.saturating_duration_since(at) < cooldown) {
            return;
        }
        *last = Some(now);
        self.prune(now);

        #[cfg(feature = "tracing")]
        if self.entries.len() > self.max_entries {
            warn!(
                tracked = self.entries.len(),
                max_entries = self.max_entries,
                "Rate limiter over capacity with all entries inside their window"
            );
        }
    }

    /// Prune stale entries every `interval` until `token` is cancelled.
    pub fn spawn_pruner(
        self: Arc<Self>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.prune(clock.now());
                    }
                }
            }
        })
    }
}

/// Claim on a destination for one issuance attempt.
///
/// Returned by [`RateLimiter::try_reserve`]. Commit it once the provider has
/// accepted the request; any other exit (error, timeout, cancellation, the
/// future being dropped) releases the claim without recording anything.
#[derive(Debug)]
#[must_use = "dropping the reservation releases it without recording the issuance"]
pub struct IssuanceReservation<'a> {
    limiter: &'a RateLimiter,
    destination: Destination,
    committed: bool,
}

impl IssuanceReservation<'_> {
    /// Destination this reservation holds.
    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Record the issuance at `now` and release the claim.
    pub fn commit(mut self, now: Instant) {
        self.limiter.commit(&self.destination, now);
        self.committed = true;
    }
}

impl Drop for IssuanceReservation<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.limiter.release(&self.destination);
        }
    }
}
