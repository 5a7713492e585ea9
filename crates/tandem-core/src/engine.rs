//! Boundary to the media engine
//!
//! The coordinator never touches GStreamer directly. Adapters implement
//! [`MediaEngine`] over a concrete pipeline; `tandem-desktop` provides the
//! `gstreamer-player` one.

use crate::{types::*, Result};
use std::time::Duration;

/// Asynchronous notification queued by the engine and drained by
/// [`MediaEngine::iterate`] on the pump thread.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Pipeline reached a new state
    StateChanged(PlaybackState),
    /// Position in seconds
    PositionUpdated(f64),
    /// Buffering progress in percent
    Buffering(i32),
    /// Duration in seconds
    DurationChanged(f64),
    Error(String),
    Warning(String),
    VideoDimensionsChanged(i32, i32),
    EndOfStream,
    SeekStart,
    SeekDone,
    MuteChanged,
    VolumeChanged,
    MediaInfoUpdated,
}

/// Pipeline clock handle.
///
/// Handles are owned: dropping one releases the underlying reference, so a
/// clock acquired inside a scope is released on every exit path.
pub trait EngineClock {
    /// Current clock time in nanoseconds
    fn time(&self) -> Option<u64>;

    /// Bound the time spent waiting on the clock (network handshakes)
    fn set_timeout(&self, timeout: Duration);
}

/// The opaque media engine the player drives
pub trait MediaEngine {
    /// Pipeline clock handle
    type Clock: EngineClock;
    /// Network time provider serving `Clock` to remote peers
    type Provider;

    /// Load media from a URI
    fn open(&mut self, uri: &str, config: &PlayerConfig) -> Result<()>;

    /// Release media resources
    fn close(&mut self);

    /// True while a pipeline object exists
    fn has_pipeline(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    /// Stop playback, taking the pipeline back to `Ready`
    fn stop(&mut self);

    /// Flushing seek in seconds
    fn seek(&mut self, seconds: f64);

    /// Request a pipeline state
    fn set_state(&mut self, state: PlaybackState) -> Result<()>;

    /// Current pipeline state
    fn state(&self) -> PlaybackState;

    /// Position in seconds
    fn position(&self) -> f64;

    /// Duration in seconds, 0 when unknown
    fn duration(&self) -> f64;

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);

    fn is_muted(&self) -> bool;

    fn set_mute(&mut self, muted: bool);

    /// Video dimensions, `(0, 0)` for audio-only media
    fn dimensions(&self) -> (i32, i32);

    /// Run one round of the engine's event loop and return the queued events
    fn iterate(&mut self) -> Vec<EngineEvent>;

    /// Hand the latest decoded frame to `consumer` if a new one is ready.
    /// Returns true when a frame was delivered.
    fn extract_frame(&mut self, consumer: &mut dyn FnMut(&[u8])) -> bool;

    /// Acquire the pipeline's clock
    fn pipeline_clock(&self) -> Option<Self::Clock>;

    /// Serve `clock` to the network on `address:port`
    fn provide_clock(&self, clock: &Self::Clock, address: &str, port: u16) -> Result<Self::Provider>;

    /// Force the pipeline onto `clock`
    fn use_clock(&mut self, clock: &Self::Clock);

    /// Drop the start time so the pipeline stops recomputing its base time
    fn clear_start_time(&mut self);

    /// Base time in nanoseconds
    fn base_time(&self) -> u64;

    fn set_base_time(&mut self, base_time: u64);
}
