//! Sender transmission-rate estimation.
//!
//! A forwarder watches sequence numbers arriving from upstream and keeps an
//! exponentially smoothed packets-per-second figure. Combined with the batch
//! size this predicts how long the sender still needs before the forwarder's
//! turn comes.

use std::time::Duration;

use crate::packet::SeqNum;

/// Weight kept from the previous estimate on every update.
pub const RATE_SMOOTHING: f64 = 0.9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateEstimator {
    last_seq: Option<SeqNum>,
    last_at: Duration,
    rate: f64,
}

impl RateEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking from `seq` received at `now`. The rate itself is kept.
    pub fn baseline(&mut self, seq: SeqNum, now: Duration) {
        self.last_seq = Some(seq);
        self.last_at = now;
    }

    /// Fold an arrival into the estimate.
    ///
    /// Only a strictly newer sequence number with a positive elapsed time
    /// updates anything; returns whether the estimate moved.
    pub fn observe(&mut self, seq: SeqNum, now: Duration) -> bool {
        let Some(last_seq) = self.last_seq else {
            self.baseline(seq, now);
            return false;
        };
        if seq <= last_seq {
            return false;
        }
        let Some(elapsed) = now.checked_sub(self.last_at).filter(|d| !d.is_zero()) else {
            return false;
        };

        let elapsed_packets = f64::from(seq - last_seq);
        let sample = elapsed_packets / elapsed.as_secs_f64();
        self.rate = RATE_SMOOTHING * self.rate + (1.0 - RATE_SMOOTHING) * sample;
        self.last_seq = Some(seq);
        self.last_at = now;
        true
    }

    /// Smoothed rate in packets per second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn last_seq(&self) -> Option<SeqNum> {
        self.last_seq
    }

    pub fn last_at(&self) -> Duration {
        self.last_at
    }

    /// Packets the sender is still expected to transmit.
    pub fn packets_left(&self, batch_size: u32) -> Option<u32> {
        self.last_seq
            .map(|seq| batch_size.saturating_sub(seq.saturating_add(1)))
    }

    /// Predicted time until the sender finishes the batch.
    pub fn forward_delay(&self, batch_size: u32) -> Option<Duration> {
        if self.rate <= 0.0 {
            return None;
        }
        let left = self.packets_left(batch_size)?;
        Duration::try_from_secs_f64(f64::from(left) / self.rate).ok()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
