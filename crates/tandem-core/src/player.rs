//! Local player facade
//!
//! Single-process, single-thread player over a [`MediaEngine`]. Designed to
//! be embedded in a host render loop: call [`Player::update`] once per frame.
//! Events raised by the engine are only observed during `update`, and all
//! hooks run on the calling thread.

use crate::{
    engine::{EngineEvent, MediaEngine},
    hooks::PlayerHooks,
    reconciler::clamp_time,
    types::*,
    Error, Result,
};
use std::path::Path;
use tracing::{debug, error, info, warn};
use url::Url;

/// What one [`Player::iterate`] observed
#[derive(Debug, Default)]
pub struct Iteration {
    /// `(old, new)` pairs of every state change, in order
    pub transitions: Vec<(PlaybackState, PlaybackState)>,
    /// End of stream restarted the media
    pub looped: bool,
}

/// Standalone media player
pub struct Player<E: MediaEngine, H: PlayerHooks = ()> {
    engine: E,
    hooks: H,
    config: PlayerConfig,
    uri: Option<String>,
    state: PlaybackState,
    duration: f64,
    width: i32,
    height: i32,
    looping: bool,
    seeking: bool,
}

impl<E: MediaEngine, H: PlayerHooks> Player<E, H> {
    /// Create a player over an engine
    pub fn new(engine: E, hooks: H) -> Self {
        Self {
            engine,
            hooks,
            config: PlayerConfig::default(),
            uri: None,
            state: PlaybackState::Null,
            duration: 0.0,
            width: 0,
            height: 0,
            looping: false,
            seeking: false,
        }
    }

    /// Open a media file or URI, keeping the current loop setting
    pub fn open(&mut self, path: &str) -> Result<()> {
        let config = PlayerConfig {
            looping: self.looping,
            ..Default::default()
        };
        self.open_with(path, config)
    }

    /// Open a media file or URI with explicit frame options
    pub fn open_with(&mut self, path: &str, config: PlayerConfig) -> Result<()> {
        self.close();

        let uri = media_uri(path)?;
        info!(uri = %uri, format = %config.format, "Opening media");

        self.engine.open(&uri, &config)?;

        let (width, height) = self.engine.dimensions();
        self.width = config.width.map(|w| w as i32).unwrap_or(width);
        self.height = config.height.map(|h| h as i32).unwrap_or(height);
        self.duration = self.engine.duration();
        self.looping = config.looping;
        self.config = config;
        self.uri = Some(uri);

        Ok(())
    }

    /// Close the current media (no-op without media)
    pub fn close(&mut self) {
        if self.uri.is_none() {
            return;
        }

        self.hooks.on_close();
        self.engine.close();

        debug!(uri = ?self.uri, "Media closed");

        self.uri = None;
        self.state = PlaybackState::Null;
        self.duration = 0.0;
        self.width = 0;
        self.height = 0;
        self.seeking = false;
    }

    /// Stop playback, rewinding to the start
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    /// Resume playback from the current time
    pub fn play(&mut self) {
        self.engine.play();
    }

    /// Pause, keeping the current time
    pub fn pause(&mut self) {
        self.engine.pause();
    }

    /// Play again from the beginning
    pub fn replay(&mut self) {
        self.stop();
        self.play();
    }

    /// Pump the engine. Must be called often from the host's update loop.
    pub fn update(&mut self) {
        self.iterate();
        self.finish_update();
    }

    /// Drain engine events, refresh cached state and run the matching hooks.
    ///
    /// Returns every state change observed, and whether end of stream
    /// restarted a looping media.
    pub fn iterate(&mut self) -> Iteration {
        let mut iteration = Iteration::default();

        for event in self.engine.iterate() {
            match event {
                EngineEvent::StateChanged(new) => {
                    if new == self.state {
                        continue;
                    }
                    let old = std::mem::replace(&mut self.state, new);
                    debug!(from = %old, to = %new, "State changed");
                    self.hooks.on_state_changed(old, new);
                    iteration.transitions.push((old, new));
                }
                EngineEvent::PositionUpdated(position) => self.hooks.on_position_changed(position),
                EngineEvent::Buffering(percent) => self.hooks.on_buffering(percent),
                EngineEvent::DurationChanged(duration) => {
                    self.duration = duration;
                    self.hooks.on_duration_changed(duration);
                }
                EngineEvent::Error(message) => {
                    error!("Player error: {}", message);
                    self.hooks.on_error(&message);
                }
                EngineEvent::Warning(message) => {
                    warn!("Player warning: {}", message);
                    self.hooks.on_warning(&message);
                }
                EngineEvent::VideoDimensionsChanged(width, height) => {
                    self.width = width;
                    self.height = height;
                    self.hooks.on_video_dimension_changed(width, height);
                }
                EngineEvent::EndOfStream => {
                    self.hooks.on_end_of_stream();
                    if self.looping {
                        debug!("End of stream, looping");
                        self.replay();
                        iteration.looped = true;
                    }
                }
                EngineEvent::SeekStart => {
                    self.seeking = true;
                    self.hooks.on_seek_start();
                }
                EngineEvent::SeekDone => {
                    self.seeking = false;
                    self.hooks.on_seek_done();
                }
                EngineEvent::MuteChanged => {
                    let muted = self.engine.is_muted();
                    self.hooks.on_mute_changed(muted);
                }
                EngineEvent::VolumeChanged => {
                    let volume = self.engine.volume();
                    self.hooks.on_volume_changed(volume);
                }
                EngineEvent::MediaInfoUpdated => self.hooks.on_media_info_updated(),
            }
        }

        iteration
    }

    /// Frame delivery and the `on_update` hook; the tail of every pump
    pub(crate) fn finish_update(&mut self) {
        let (width, height) = (self.width, self.height);
        let hooks = &mut self.hooks;
        self.engine.extract_frame(&mut |data| {
            hooks.on_video_frame(VideoFrame { data, width, height });
        });

        self.hooks.on_update();
    }

    /// Duration of the media in seconds
    pub fn duration(&self) -> f64 {
        if self.duration > 0.0 {
            self.duration
        } else {
            self.engine.duration()
        }
    }

    /// Request a pipeline state
    pub fn set_state(&mut self, state: PlaybackState) -> Result<()> {
        self.engine.set_state(state)
    }

    /// Last state reported by the engine
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn set_loop(&mut self, on: bool) {
        self.looping = on;
        self.config.looping = on;
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Seek to `time` seconds, clamped to the media duration
    pub fn set_time(&mut self, time: f64) {
        let target = clamp_time(time, self.duration());
        self.seeking = true;
        self.hooks.on_seek_start();
        self.engine.seek(target);
    }

    /// Current position in `[0, duration]`
    pub fn time(&self) -> f64 {
        self.engine.position()
    }

    /// Set volume (0.0 - 1.0)
    pub fn set_volume(&mut self, volume: f64) {
        self.engine.set_volume(volume.clamp(0.0, 1.0));
    }

    pub fn volume(&self) -> f64 {
        self.engine.volume()
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.engine.set_mute(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.engine.is_muted()
    }

    /// Video width, 0 for audio-only media
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Video height, 0 for audio-only media
    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn is_seeking(&self) -> bool {
        self.seeking
    }

    /// URI of the open media
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// Options the media was opened with
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }
}

impl<E: MediaEngine, H: PlayerHooks> Drop for Player<E, H> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Turn a file path or URI into a URI the engine can load
pub fn media_uri(path: &str) -> Result<String> {
    if path.contains("://") {
        let url = Url::parse(path).map_err(|e| Error::InvalidPath(format!("{path}: {e}")))?;
        return Ok(url.into());
    }

    let absolute = Path::new(path)
        .canonicalize()
        .map_err(|e| Error::InvalidPath(format!("{path}: {e}")))?;

    Url::from_file_path(&absolute)
        .map(Into::into)
        .map_err(|_| Error::InvalidPath(absolute.display().to_string()))
}
