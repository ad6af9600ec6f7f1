use crate::events::{HarvestEventEmitter, HarvestEventSender};
use crate::{CancellationState, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::Mutex;

/// Draw a pause uniformly from `[0, cap)`, in milliseconds.
pub fn sample_delay<R: Rng + ?Sized>(rng: &mut R, cap: Duration) -> Duration {
    let cap_millis = cap.as_millis() as u64;
    if cap_millis == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..cap_millis))
}

struct GateState {
    rng: StdRng,
    starts: u64,
}

/// Randomized spacing between successive lyrics fetches.
///
/// Callers pass through [`RateLimiter::wait_turn`] before each fetch. The
/// gate admits one caller at a time, and every caller after the first sleeps
/// a freshly sampled delay while holding it, so fetch starts are spread out
/// even when several fetches are in flight.
pub struct RateLimiter {
    cap: Duration,
    gate: Mutex<GateState>,
}

impl RateLimiter {
    pub fn new(cap_secs: u64) -> Self {
        Self::from_rng(cap_secs, StdRng::from_entropy())
    }

    /// A limiter with a reproducible delay sequence.
    pub fn with_seed(cap_secs: u64, seed: u64) -> Self {
        Self::from_rng(cap_secs, StdRng::seed_from_u64(seed))
    }

    fn from_rng(cap_secs: u64, rng: StdRng) -> Self {
        Self {
            cap: Duration::from_secs(cap_secs),
            gate: Mutex::new(GateState { rng, starts: 0 }),
        }
    }

    pub fn cap(&self) -> Duration {
        self.cap
    }

    /// Wait until this caller may start its fetch.
    ///
    /// Returns the pause that was taken (zero for the first caller). Fails
    /// with [`HarvestError::Cancelled`](crate::HarvestError::Cancelled) if
    /// cancellation fires while waiting.
    pub async fn wait_turn(
        &self,
        cancel: &CancellationState,
        events: Option<&HarvestEventSender>,
    ) -> Result<Duration> {
        let mut gate = self.gate.lock().await;
        cancel.check()?;

        gate.starts += 1;
        if gate.starts == 1 {
            return Ok(Duration::ZERO);
        }

        let delay = sample_delay(&mut gate.rng, self.cap);
        log::debug!("Throttling next fetch for {} ms", delay.as_millis());
        if let Some(events) = events {
            events.emit_throttled(delay.as_millis() as u64);
        }

        cancel.sleep(delay).await?;
        Ok(delay)
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("cap", &self.cap).finish()
    }
}
