//! Transport Reconciler
//!
//! Holds the deferred transport requests of a network player and decides,
//! once per pump, what to do with them:
//!
//! - seeks are recorded by [`Reconciler::set_time`] and only applied when
//!   the pipeline sits in `Ready`, by shifting the pipeline base time
//!   instead of issuing a flushing seek;
//! - the position lost across a pause-triggered flush is captured on entry
//!   to `Paused` and re-issued as a seek on the way out;
//! - a heartbeat is due every `heartbeat_frequency + 1` passes.
//!
//! The reconciler never touches the engine; the server turns its decisions
//! into engine calls.

use crate::{config::DEFAULT_HEARTBEAT_FREQUENCY, types::PlaybackState};
use tracing::{debug, warn};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// What the server must do after a state change
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateReaction {
    /// Nothing to do
    None,
    /// The pipeline was reset to `Ready`; release the clock binding
    ClearClock,
    /// Entered `Paused`; the position was captured
    CapturedPosition(f64),
    /// Left `Paused` with a captured position; seek back to it
    Reseek(f64),
}

/// Seek work for the current pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekStep {
    /// No seek pending
    Idle,
    /// Seek pending but the pipeline is not `Ready`; request a stop
    Stop,
    /// Apply the seek, then restore `restore`
    Apply { target: f64, restore: PlaybackState },
}

/// Pending transport requests and heartbeat cadence
#[derive(Debug, Clone)]
pub struct Reconciler {
    pending_seek: Option<f64>,
    pending_state_seek: Option<f64>,
    pending_state: PlaybackState,
    heartbeat_counter: u32,
    heartbeat_frequency: u32,
    seek_retries: u32,
    max_seek_retries: Option<u32>,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(DEFAULT_HEARTBEAT_FREQUENCY)
    }
}

impl Reconciler {
    pub fn new(heartbeat_frequency: u32) -> Self {
        Self {
            pending_seek: None,
            pending_state_seek: None,
            pending_state: PlaybackState::Null,
            heartbeat_counter: 0,
            heartbeat_frequency,
            seek_retries: 0,
            max_seek_retries: None,
        }
    }

    /// Abandon a pending seek after `retries` unanswered stop requests
    pub fn with_max_seek_retries(mut self, retries: Option<u32>) -> Self {
        self.max_seek_retries = retries;
        self
    }

    /// Record a seek to `time`, applied on a later pass.
    ///
    /// The target is clamped into `[0, duration]`. Repeating the pending
    /// target is a no-op; otherwise `current` is captured as the state to
    /// restore once the seek lands. Returns true when the request was recorded.
    pub fn set_time(&mut self, time: f64, duration: f64, current: PlaybackState) -> bool {
        let target = clamp_time(time, duration);

        if self.pending_seek == Some(target) {
            return false;
        }

        debug!(target, restore = %current, "Seek deferred");

        self.pending_seek = Some(target);
        self.pending_state = current;
        self.seek_retries = 0;
        true
    }

    /// React to the pipeline moving from `old` to `new`.
    ///
    /// `position` is the playback position at the time of the change.
    pub fn on_state_changed(&mut self, old: PlaybackState, new: PlaybackState, position: f64) -> StateReaction {
        if new == PlaybackState::Ready {
            StateReaction::ClearClock
        } else if new == PlaybackState::Paused {
            self.pending_state_seek = Some(position);
            StateReaction::CapturedPosition(position)
        } else if old == PlaybackState::Paused {
            match self.pending_state_seek.take() {
                Some(position) => StateReaction::Reseek(position),
                None => StateReaction::None,
            }
        } else {
            StateReaction::None
        }
    }

    /// Advance the heartbeat counter for this pass.
    ///
    /// Returns true when a heartbeat is due; the counter is then back at 0.
    pub fn tick_heartbeat(&mut self) -> bool {
        self.heartbeat_counter = self.heartbeat_counter.saturating_add(1);

        if self.heartbeat_counter > self.heartbeat_frequency {
            self.heartbeat_counter = 0;
            true
        } else {
            false
        }
    }

    /// Decide the seek work for this pass given the pipeline state
    pub fn seek_step(&mut self, state: PlaybackState) -> SeekStep {
        let Some(target) = self.pending_seek else {
            return SeekStep::Idle;
        };

        if state == PlaybackState::Ready {
            return SeekStep::Apply {
                target,
                restore: self.pending_state,
            };
        }

        self.seek_retries = self.seek_retries.saturating_add(1);
        if let Some(max) = self.max_seek_retries {
            if self.seek_retries > max {
                warn!(target, retries = max, state = %state, "Pipeline never reached READY, dropping seek");
                self.complete_seek();
                return SeekStep::Idle;
            }
        }

        SeekStep::Stop
    }

    /// Clear the pending seek and state once applied
    pub fn complete_seek(&mut self) {
        self.pending_seek = None;
        self.pending_state = PlaybackState::Null;
        self.seek_retries = 0;
    }

    /// Change the heartbeat period. A new value restarts the count.
    pub fn set_heartbeat_frequency(&mut self, frequency: u32) {
        if frequency == self.heartbeat_frequency {
            return;
        }

        self.heartbeat_frequency = frequency;
        self.heartbeat_counter = 0;
    }

    pub fn heartbeat_frequency(&self) -> u32 {
        self.heartbeat_frequency
    }

    pub fn heartbeat_counter(&self) -> u32 {
        self.heartbeat_counter
    }

    pub fn pending_seek(&self) -> Option<f64> {
        self.pending_seek
    }

    pub fn pending_state_seek(&self) -> Option<f64> {
        self.pending_state_seek
    }

    pub fn pending_state(&self) -> PlaybackState {
        self.pending_state
    }

    /// Stop requests issued for the current pending seek
    pub fn seek_retries(&self) -> u32 {
        self.seek_retries
    }
}

/// Clamp a seek target into `[0, duration]`; NaN maps to 0
pub fn clamp_time(time: f64, duration: f64) -> f64 {
    if time.is_nan() {
        return 0.0;
    }
    time.min(duration.max(0.0)).max(0.0)
}

/// Base time that puts the running time of `clock_now` at `target` seconds.
///
/// Shifts `base_time` by the difference between the current elapsed time
/// and the target; the result saturates at 0.
pub fn shifted_base_time(clock_now: u64, base_time: u64, target: f64) -> u64 {
    let elapsed = i128::from(clock_now) - i128::from(base_time);
    let delta = elapsed - (target * NANOS_PER_SECOND).round() as i128;
    (i128::from(base_time) + delta).clamp(0, i128::from(u64::MAX)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND_NS: u64 = 1_000_000_000;

    #[test]
    fn test_clamping() {
        let mut reconciler = Reconciler::default();

        reconciler.set_time(-5.0, 100.0, PlaybackState::Playing);
        assert_eq!(reconciler.pending_seek(), Some(0.0));

        reconciler.set_time(500.0, 100.0, PlaybackState::Playing);
        assert_eq!(reconciler.pending_seek(), Some(100.0));

        assert_eq!(clamp_time(f64::NAN, 10.0), 0.0);
        assert_eq!(clamp_time(5.0, 0.0), 0.0);
    }

    #[test]
    fn test_repeated_seek_is_idempotent() {
        let mut reconciler = Reconciler::default();

        assert!(reconciler.set_time(10.0, 100.0, PlaybackState::Playing));
        assert!(!reconciler.set_time(10.0, 100.0, PlaybackState::Paused));

        assert_eq!(reconciler.pending_seek(), Some(10.0));
        assert_eq!(reconciler.pending_state(), PlaybackState::Playing);
    }

    #[test]
    fn test_last_seek_wins() {
        let mut reconciler = Reconciler::default();

        reconciler.set_time(10.0, 100.0, PlaybackState::Playing);
        reconciler.set_time(20.0, 100.0, PlaybackState::Paused);

        assert_eq!(reconciler.pending_seek(), Some(20.0));
        assert_eq!(reconciler.pending_state(), PlaybackState::Paused);
    }

    #[test]
    fn test_heartbeat_cadence() {
        let mut reconciler = Reconciler::new(30);

        let fired = (0..30).filter(|_| reconciler.tick_heartbeat()).count();
        assert_eq!(fired, 0);
        assert_eq!(reconciler.heartbeat_counter(), 30);

        assert!(reconciler.tick_heartbeat());
        assert_eq!(reconciler.heartbeat_counter(), 0);

        let fired = (0..62).filter(|_| reconciler.tick_heartbeat()).count();
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_frequency_reconfiguration() {
        let mut reconciler = Reconciler::new(30);
        for _ in 0..12 {
            reconciler.tick_heartbeat();
        }

        reconciler.set_heartbeat_frequency(30);
        assert_eq!(reconciler.heartbeat_counter(), 12);

        reconciler.set_heartbeat_frequency(5);
        assert_eq!(reconciler.heartbeat_counter(), 0);
        assert_eq!(reconciler.heartbeat_frequency(), 5);
    }

    #[test]
    fn test_state_reactions() {
        let mut reconciler = Reconciler::default();

        assert_eq!(
            reconciler.on_state_changed(PlaybackState::Null, PlaybackState::Ready, 0.0),
            StateReaction::ClearClock
        );
        assert_eq!(
            reconciler.on_state_changed(PlaybackState::Playing, PlaybackState::Paused, 7.5),
            StateReaction::CapturedPosition(7.5)
        );
        assert_eq!(reconciler.pending_state_seek(), Some(7.5));

        assert_eq!(
            reconciler.on_state_changed(PlaybackState::Paused, PlaybackState::Playing, 0.0),
            StateReaction::Reseek(7.5)
        );
        assert_eq!(reconciler.pending_state_seek(), None);

        assert_eq!(
            reconciler.on_state_changed(PlaybackState::Paused, PlaybackState::Playing, 0.0),
            StateReaction::None
        );
    }

    #[test]
    fn test_seek_gating() {
        let mut reconciler = Reconciler::default();
        assert_eq!(reconciler.seek_step(PlaybackState::Playing), SeekStep::Idle);

        reconciler.set_time(10.0, 100.0, PlaybackState::Playing);
        assert_eq!(reconciler.seek_step(PlaybackState::Playing), SeekStep::Stop);
        assert_eq!(reconciler.seek_step(PlaybackState::Paused), SeekStep::Stop);
        assert_eq!(reconciler.pending_seek(), Some(10.0));
        assert_eq!(reconciler.seek_retries(), 2);

        assert_eq!(
            reconciler.seek_step(PlaybackState::Ready),
            SeekStep::Apply {
                target: 10.0,
                restore: PlaybackState::Playing
            }
        );

        reconciler.complete_seek();
        assert_eq!(reconciler.pending_seek(), None);
        assert_eq!(reconciler.pending_state(), PlaybackState::Null);
    }

    #[test]
    fn test_bounded_seek_retries() {
        let mut reconciler = Reconciler::default().with_max_seek_retries(Some(2));
        reconciler.set_time(10.0, 100.0, PlaybackState::Playing);

        assert_eq!(reconciler.seek_step(PlaybackState::Playing), SeekStep::Stop);
        assert_eq!(reconciler.seek_step(PlaybackState::Playing), SeekStep::Stop);
        assert_eq!(reconciler.seek_step(PlaybackState::Playing), SeekStep::Idle);
        assert_eq!(reconciler.pending_seek(), None);
    }

    #[test]
    fn test_shifted_base_time() {
        // 40s elapsed, seek to 10s: base moves 30s later
        assert_eq!(shifted_base_time(50_000_000_000, 10_000_000_000, 10.0), 40_000_000_000);
        // seek forward past the clock start saturates
        assert_eq!(shifted_base_time(5_000_000_000, 1_000_000_000, 10.0), 0);
        // seeking to the current position leaves the base untouched
        assert_eq!(shifted_base_time(3_000_000_000, 1_000_000_000, 2.0), 1_000_000_000);
    }

    #[test]
    fn test_shifted_base_time_keeps_nanoseconds_on_large_clocks() {
        // past 2^53 ns an f64 can no longer tell these clock readings apart
        let base = 1u64 << 60;
        assert_eq!(shifted_base_time(base + 1, base, 0.0), base + 1);
        assert_eq!(shifted_base_time(base + 7, base + 3, 0.0), base + 7);
        assert_eq!(shifted_base_time(u64::MAX, u64::MAX - 2 * SECOND_NS, 1.0), u64::MAX - SECOND_NS);
    }
}
