//! Player event hooks
//!
//! Every method defaults to a no-op; implement only the events you care
//! about. Hooks run synchronously on the thread calling `update()`.
//!
//! ```rust
//! use tandem_core::{PlayerHooks, VideoFrame};
//!
//! struct Uploader {
//!     frames: usize,
//! }
//!
//! impl PlayerHooks for Uploader {
//!     fn on_video_frame(&mut self, frame: VideoFrame<'_>) {
//!         self.frames += 1;
//!         // upload frame.data (frame.width x frame.height) to a texture
//!     }
//! }
//! ```

use crate::types::{PlaybackState, VideoFrame};

#[allow(unused_variables)]
pub trait PlayerHooks {
    fn on_buffering(&mut self, percent: i32) {}

    fn on_duration_changed(&mut self, duration: f64) {}

    fn on_end_of_stream(&mut self) {}

    /// Engine error (decode failure, missing codec)
    fn on_error(&mut self, message: &str) {}

    fn on_warning(&mut self, message: &str) {}

    fn on_media_info_updated(&mut self) {}

    fn on_mute_changed(&mut self, muted: bool) {}

    fn on_volume_changed(&mut self, volume: f64) {}

    fn on_position_changed(&mut self, position: f64) {}

    fn on_seek_start(&mut self) {}

    fn on_seek_done(&mut self) {}

    fn on_state_changed(&mut self, old: PlaybackState, new: PlaybackState) {}

    fn on_video_dimension_changed(&mut self, width: i32, height: i32) {}

    /// End of every `update()` call
    fn on_update(&mut self) {}

    /// Before media is closed
    fn on_close(&mut self) {}

    /// The network clock is bound and the pipeline rebased on it
    fn on_clock_setup(&mut self) {}

    /// The network clock binding was released
    fn on_clock_clear(&mut self) {}

    /// A decoded frame is ready; the data is only valid during the call
    fn on_video_frame(&mut self, frame: VideoFrame<'_>) {}

    /// Raw record received from a peer
    fn on_message(&mut self, message: &str) {}
}

/// No hooks
impl PlayerHooks for () {}

impl<H: PlayerHooks + ?Sized> PlayerHooks for Box<H> {
    fn on_buffering(&mut self, percent: i32) {
        (**self).on_buffering(percent)
    }

    fn on_duration_changed(&mut self, duration: f64) {
        (**self).on_duration_changed(duration)
    }

    fn on_end_of_stream(&mut self) {
        (**self).on_end_of_stream()
    }

    fn on_error(&mut self, message: &str) {
        (**self).on_error(message)
    }

    fn on_warning(&mut self, message: &str) {
        (**self).on_warning(message)
    }

    fn on_media_info_updated(&mut self) {
        (**self).on_media_info_updated()
    }

    fn on_mute_changed(&mut self, muted: bool) {
        (**self).on_mute_changed(muted)
    }

    fn on_volume_changed(&mut self, volume: f64) {
        (**self).on_volume_changed(volume)
    }

    fn on_position_changed(&mut self, position: f64) {
        (**self).on_position_changed(position)
    }

    fn on_seek_start(&mut self) {
        (**self).on_seek_start()
    }

    fn on_seek_done(&mut self) {
        (**self).on_seek_done()
    }

    fn on_state_changed(&mut self, old: PlaybackState, new: PlaybackState) {
        (**self).on_state_changed(old, new)
    }

    fn on_video_dimension_changed(&mut self, width: i32, height: i32) {
        (**self).on_video_dimension_changed(width, height)
    }

    fn on_update(&mut self) {
        (**self).on_update()
    }

    fn on_close(&mut self) {
        (**self).on_close()
    }

    fn on_clock_setup(&mut self) {
        (**self).on_clock_setup()
    }

    fn on_clock_clear(&mut self) {
        (**self).on_clock_clear()
    }

    fn on_video_frame(&mut self, frame: VideoFrame<'_>) {
        (**self).on_video_frame(frame)
    }

    fn on_message(&mut self, message: &str) {
        (**self).on_message(message)
    }
}
