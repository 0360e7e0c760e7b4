//! Live-adjustable rate control for pathway generation.
//!
//! The controller answers one question, how long to wait between starting two
//! pathways, and lets that answer change while the simulator runs. Rate
//! changes are published on a watch channel so the generation loop can wake
//! up immediately instead of sleeping out the old interval.

use std::time::Duration;

use tokio::sync::watch;

/// Converts a rate of `rate` pathways per `per` into wait intervals.
///
/// A rate of zero means "do not generate": [`RateController::heartbeat`]
/// returns [`Duration::MAX`] as a never-fires sentinel, and generation
/// resumes as soon as the rate is raised again.
#[derive(Debug)]
pub struct RateController {
    per: Duration,
    rate_tx: watch::Sender<f64>,
}

impl RateController {
    /// Creates a controller generating `rate` pathways every `per`.
    pub fn new(rate: f64, per: Duration) -> Self {
        let (rate_tx, _rate_rx) = watch::channel(rate);
        Self { per, rate_tx }
    }

    /// The current rate, in pathways per [`Self::per`].
    pub fn rate(&self) -> f64 {
        *self.rate_tx.borrow()
    }

    /// The period the rate is expressed against.
    pub fn per(&self) -> Duration {
        self.per
    }

    /// Updates the rate and wakes subscribers. Setting the same value again
    /// is a no-op so spurious updates do not disturb the generation loop.
    /// Returns whether the rate actually changed.
    pub fn set_rate(&self, rate: f64) -> bool {
        self.rate_tx.send_if_modified(|current| {
            if *current == rate {
                false
            } else {
                *current = rate;
                true
            }
        })
    }

    /// A receiver that resolves whenever the rate changes.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.rate_tx.subscribe()
    }

    /// The wait between two consecutive pathway starts at the current rate.
    pub fn heartbeat(&self) -> Duration {
        let rate = self.rate();
        if rate == 0.0 {
            tracing::info!(rate, per = ?self.per, "Rate set to zero, not generating pathways");
            return Duration::MAX;
        }
        let heartbeat = self.interval(rate);
        tracing::debug!(rate, per = ?self.per, heartbeat = ?heartbeat, "Generating one pathway per heartbeat");
        heartbeat
    }

    /// Elapsed time to credit the generation loop with at startup: a full
    /// heartbeat when the rate is positive, so the first pathway starts
    /// immediately, and zero otherwise.
    pub fn initial_elapsed(&self) -> Duration {
        let rate = self.rate();
        if rate > 0.0 {
            self.interval(rate)
        } else {
            Duration::ZERO
        }
    }

    fn interval(&self, rate: f64) -> Duration {
        // Very small rates overflow the duration type; saturate instead.
        Duration::try_from_secs_f64(self.per.as_secs_f64() / rate).unwrap_or(Duration::MAX)
    }
}
