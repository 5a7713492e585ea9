//! GStreamer engine - `gstreamer-player` behind the core `MediaEngine` trait
//!
//! Features:
//! - Signals dispatched on a private `glib::MainContext`, drained by `iterate`
//! - Raw frames through an `appsink` video sink
//! - Network clock serving via `gstreamer-net`

use anyhow::Context;
use gstreamer as gst;
use gstreamer::glib;
use gstreamer::glib::translate::{from_glib_full, ToGlibPtr};
use gstreamer::prelude::*;
use gstreamer_net as gst_net;
use gstreamer_player as gst_player;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tandem_core::{EngineClock, EngineEvent, Error, MediaEngine, PlaybackState, PlayerConfig, Result};
use tracing::{debug, info, warn};

use crate::frame::FrameExtractor;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

type EventQueue = Arc<Mutex<VecDeque<EngineEvent>>>;

/// Pipeline clock served to peers
#[derive(Debug, Clone)]
pub struct NetClock(gst::Clock);

impl EngineClock for NetClock {
    fn time(&self) -> Option<u64> {
        let time: Option<gst::ClockTime> = self.0.time().into();
        time.map(|t| t.nseconds())
    }

    fn set_timeout(&self, timeout: Duration) {
        self.0
            .set_timeout(gst::ClockTime::from_nseconds(timeout.as_nanos() as u64));
    }
}

/// `gstreamer-player` backed media engine
pub struct GstEngine {
    context: glib::MainContext,
    player: Option<gst_player::Player>,
    frames: Option<FrameExtractor>,
    events: EventQueue,
}

impl GstEngine {
    /// Initialize GStreamer and create an engine with no media loaded
    pub fn new() -> anyhow::Result<Self> {
        gst::init().context("Failed to initialize GStreamer")?;

        Ok(Self {
            context: glib::MainContext::new(),
            player: None,
            frames: None,
            events: Arc::default(),
        })
    }

    /// The playbin of the open media
    pub fn pipeline(&self) -> Option<gst::Pipeline> {
        self.player
            .as_ref()?
            .pipeline()
            .downcast::<gst::Pipeline>()
            .ok()
    }

    /// Forward player signals into the event queue. The closures run when
    /// the private context is iterated.
    fn connect_signals(player: &gst_player::Player, events: &EventQueue) {
        let queue = events.clone();
        player.connect_state_changed(move |_, state| {
            push(&queue, EngineEvent::StateChanged(from_player_state(state)));
        });

        let queue = events.clone();
        player.connect_position_updated(move |_, position| {
            if let Some(position) = position {
                push(&queue, EngineEvent::PositionUpdated(seconds(position)));
            }
        });

        let queue = events.clone();
        player.connect_duration_changed(move |_, duration| {
            if let Some(duration) = duration {
                push(&queue, EngineEvent::DurationChanged(seconds(duration)));
            }
        });

        let queue = events.clone();
        player.connect_buffering(move |_, percent| {
            push(&queue, EngineEvent::Buffering(percent));
        });

        let queue = events.clone();
        player.connect_end_of_stream(move |_| {
            push(&queue, EngineEvent::EndOfStream);
        });

        let queue = events.clone();
        player.connect_error(move |_, error| {
            push(&queue, EngineEvent::Error(error.to_string()));
        });

        let queue = events.clone();
        player.connect_warning(move |_, warning| {
            push(&queue, EngineEvent::Warning(warning.to_string()));
        });

        let queue = events.clone();
        player.connect_video_dimensions_changed(move |_, width, height| {
            push(&queue, EngineEvent::VideoDimensionsChanged(width, height));
        });

        let queue = events.clone();
        player.connect_seek_done(move |_, _| {
            push(&queue, EngineEvent::SeekDone);
        });

        let queue = events.clone();
        player.connect_mute_changed(move |_| {
            push(&queue, EngineEvent::MuteChanged);
        });

        let queue = events.clone();
        player.connect_volume_changed(move |_| {
            push(&queue, EngineEvent::VolumeChanged);
        });

        let queue = events.clone();
        player.connect_media_info_updated(move |_, _| {
            push(&queue, EngineEvent::MediaInfoUpdated);
        });
    }
}

impl MediaEngine for GstEngine {
    type Clock = NetClock;
    type Provider = gst_net::NetTimeProvider;

    fn open(&mut self, uri: &str, config: &PlayerConfig) -> Result<()> {
        self.close();

        let frames = FrameExtractor::new(config)?;

        let dispatcher = gst_player::PlayerGMainContextSignalDispatcher::new(Some(&self.context));
        let player = gst_player::Player::new(None::<gst_player::PlayerVideoRenderer>, Some(dispatcher));

        player.pipeline().set_property("video-sink", frames.sink());
        Self::connect_signals(&player, &self.events);

        player.set_uri(Some(uri));
        player.pause();

        info!(uri, "Pipeline created");

        self.player = Some(player);
        self.frames = Some(frames);
        Ok(())
    }

    fn close(&mut self) {
        let Some(player) = self.player.take() else {
            return;
        };

        player.stop();
        if let Err(e) = player.pipeline().set_state(gst::State::Null) {
            warn!("Failed to release pipeline: {}", e);
        }

        self.frames = None;
        if let Ok(mut queue) = self.events.lock() {
            queue.clear();
        }

        debug!("Pipeline released");
    }

    fn has_pipeline(&self) -> bool {
        self.player.is_some()
    }

    fn play(&mut self) {
        if let Some(player) = &self.player {
            player.play();
        }
    }

    fn pause(&mut self) {
        if let Some(player) = &self.player {
            player.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(player) = &self.player {
            player.stop();
        }
    }

    fn seek(&mut self, seconds: f64) {
        if let Some(player) = &self.player {
            let position = (seconds.max(0.0) * NANOS_PER_SECOND) as u64;
            player.seek(gst::ClockTime::from_nseconds(position));
        }
    }

    fn set_state(&mut self, state: PlaybackState) -> Result<()> {
        let player = self.player.as_ref().ok_or(Error::NoPipeline)?;

        player
            .pipeline()
            .set_state(to_gst_state(state))
            .map_err(|_| Error::StateChange { state })?;
        Ok(())
    }

    fn state(&self) -> PlaybackState {
        self.player
            .as_ref()
            .map(|p| from_gst_state(p.pipeline().current_state()))
            .unwrap_or_default()
    }

    fn position(&self) -> f64 {
        self.player
            .as_ref()
            .and_then(|p| p.position())
            .map(seconds)
            .unwrap_or(0.0)
    }

    fn duration(&self) -> f64 {
        self.player
            .as_ref()
            .and_then(|p| p.duration())
            .map(seconds)
            .unwrap_or(0.0)
    }

    fn volume(&self) -> f64 {
        self.player.as_ref().map(|p| p.volume()).unwrap_or(1.0)
    }

    fn set_volume(&mut self, volume: f64) {
        if let Some(player) = &self.player {
            player.set_volume(volume);
        }
    }

    fn is_muted(&self) -> bool {
        self.player.as_ref().map(|p| p.is_muted()).unwrap_or(false)
    }

    fn set_mute(&mut self, muted: bool) {
        if let Some(player) = &self.player {
            player.set_mute(muted);
        }
    }

    fn dimensions(&self) -> (i32, i32) {
        self.frames
            .as_ref()
            .and_then(FrameExtractor::dimensions)
            .unwrap_or((0, 0))
    }

    fn iterate(&mut self) -> Vec<EngineEvent> {
        while self.context.pending() {
            self.context.iteration(false);
        }

        self.events
            .lock()
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    fn extract_frame(&mut self, consumer: &mut dyn FnMut(&[u8])) -> bool {
        self.frames
            .as_ref()
            .map(|frames| frames.extract(consumer))
            .unwrap_or(false)
    }

    fn pipeline_clock(&self) -> Option<NetClock> {
        self.pipeline().map(|p| NetClock(p.pipeline_clock()))
    }

    /// Serve `clock` on `address:port`. The constructor returns NULL when
    /// the socket cannot be bound, which the safe binding does not surface.
    fn provide_clock(&self, clock: &NetClock, address: &str, port: u16) -> Result<gst_net::NetTimeProvider> {
        let raw = unsafe {
            gst_net::ffi::gst_net_time_provider_new(
                clock.0.to_glib_none().0,
                address.to_glib_none().0,
                i32::from(port),
            )
        };
        if raw.is_null() {
            return Err(Error::Clock(format!("cannot serve clock on {address}:{port}")));
        }

        // SAFETY: non-null and returned with full ownership
        let provider: gst_net::NetTimeProvider = unsafe { from_glib_full(raw) };

        let bound = provider.property::<i32>("port");
        if port != 0 && bound != i32::from(port) {
            return Err(Error::Clock(format!("clock served on port {bound}, wanted {port}")));
        }

        debug!(address, port = bound, "Network time provider started");
        Ok(provider)
    }

    fn use_clock(&mut self, clock: &NetClock) {
        if let Some(pipeline) = self.pipeline() {
            pipeline.use_clock(Some(&clock.0));
        }
    }

    fn clear_start_time(&mut self) {
        if let Some(pipeline) = self.pipeline() {
            pipeline.set_start_time(gst::ClockTime::NONE);
        }
    }

    fn base_time(&self) -> u64 {
        self.pipeline()
            .and_then(|p| {
                let base_time: Option<gst::ClockTime> = p.base_time().into();
                base_time
            })
            .map(|t| t.nseconds())
            .unwrap_or(0)
    }

    fn set_base_time(&mut self, base_time: u64) {
        if let Some(pipeline) = self.pipeline() {
            pipeline.set_base_time(gst::ClockTime::from_nseconds(base_time));
        }
    }
}

impl Drop for GstEngine {
    fn drop(&mut self) {
        self.close();
    }
}

fn push(queue: &EventQueue, event: EngineEvent) {
    if let Ok(mut queue) = queue.lock() {
        queue.push_back(event);
    }
}

fn seconds(time: gst::ClockTime) -> f64 {
    time.nseconds() as f64 / NANOS_PER_SECOND
}

/// `gstreamer-player` stops by taking the pipeline to `Ready`
fn from_player_state(state: gst_player::PlayerState) -> PlaybackState {
    match state {
        gst_player::PlayerState::Stopped => PlaybackState::Ready,
        gst_player::PlayerState::Buffering | gst_player::PlayerState::Paused => PlaybackState::Paused,
        gst_player::PlayerState::Playing => PlaybackState::Playing,
        _ => PlaybackState::Null,
    }
}

fn from_gst_state(state: gst::State) -> PlaybackState {
    match state {
        gst::State::Ready => PlaybackState::Ready,
        gst::State::Paused => PlaybackState::Paused,
        gst::State::Playing => PlaybackState::Playing,
        _ => PlaybackState::Null,
    }
}

fn to_gst_state(state: PlaybackState) -> gst::State {
    match state {
        PlaybackState::Null => gst::State::Null,
        PlaybackState::Ready => gst::State::Ready,
        PlaybackState::Paused => gst::State::Paused,
        PlaybackState::Playing => gst::State::Playing,
    }
}

/// Check GStreamer installation and capabilities
pub fn check_gstreamer_installation() -> anyhow::Result<GStreamerInfo> {
    gst::init().context("Failed to initialize GStreamer")?;

    let (major, minor, micro, nano) = gst::version();
    let version = format!("{}.{}.{}.{}", major, minor, micro, nano);

    let required_elements = [
        ("playbin", "Core playback"),
        ("appsink", "Frame extraction"),
        ("videoconvert", "Format conversion"),
        ("videoscale", "Frame scaling"),
        ("decodebin", "Auto decoding"),
    ];

    let missing_elements = required_elements
        .iter()
        .filter(|(element, _)| gst::ElementFactory::find(element).is_none())
        .map(|(element, desc)| format!("{} ({})", element, desc))
        .collect();

    Ok(GStreamerInfo {
        version,
        missing_elements,
    })
}

/// GStreamer installation information
#[derive(Debug)]
pub struct GStreamerInfo {
    pub version: String,
    pub missing_elements: Vec<String>,
}

impl GStreamerInfo {
    pub fn is_complete(&self) -> bool {
        self.missing_elements.is_empty()
    }
}
