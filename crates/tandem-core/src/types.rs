//! Core types shared by the player, the coordinator and the engine adapters

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Playback State
// =============================================================================

/// Pipeline state, mirroring GStreamer's element state ladder.
///
/// The discriminants match `GstState` so the ordinal can go on the wire as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No resources allocated
    #[default]
    Null = 1,
    /// Resources allocated, not prerolled. Seeks are applied from here.
    Ready = 2,
    /// Prerolled, clock stopped
    Paused = 3,
    /// Clock running
    Playing = 4,
}

impl PlaybackState {
    /// Engine ordinal used in heartbeats
    pub fn ordinal(self) -> i32 {
        self as i32
    }

    /// Map an engine ordinal back to a state.
    ///
    /// `0` is GStreamer's `VOID_PENDING` and maps to `Null`.
    pub fn from_ordinal(value: i32) -> Option<Self> {
        match value {
            0 | 1 => Some(Self::Null),
            2 => Some(Self::Ready),
            3 => Some(Self::Paused),
            4 => Some(Self::Playing),
            _ => None,
        }
    }

    /// True once the pipeline has prerolled media
    pub fn is_active(self) -> bool {
        matches!(self, Self::Paused | Self::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "NULL",
            Self::Ready => "READY",
            Self::Paused => "PAUSED",
            Self::Playing => "PLAYING",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Player Configuration
// =============================================================================

/// Options for opening media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Scale decoded frames to this width (native width when unset)
    pub width: Option<u32>,
    /// Scale decoded frames to this height (native height when unset)
    pub height: Option<u32>,
    /// Raw video format handed to the frame hook
    pub format: String,
    /// Restart playback on end of stream
    pub looping: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            format: "BGRA".to_string(),
            looping: false,
        }
    }
}

impl PlayerConfig {
    /// Resize frames to a fixed resolution
    pub fn sized(width: u32, height: u32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    /// Convert frames to the given raw format (e.g. `RGBA`, `I420`)
    pub fn formatted(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Video Frames
// =============================================================================

/// A decoded frame borrowed from the engine for the duration of the hook call
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    /// Mapped pixel data
    pub data: &'a [u8],
    /// Frame width in pixels, 0 when unknown
    pub width: i32,
    /// Frame height in pixels, 0 when unknown
    pub height: i32,
}

impl VideoFrame<'_> {
    /// Byte length of the mapped buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
