//! Video frame extraction
//!
//! Decoded frames land in an `appsink` installed as the playbin video sink.
//! The sink callbacks run on a streaming thread and only raise a dirty flag;
//! the pump thread pulls the sample without blocking and hands the mapped
//! buffer to the frame hook.

use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tandem_core::{Error, PlayerConfig, Result};
use tracing::debug;

/// Pulls decoded frames out of the video sink
pub struct FrameExtractor {
    appsink: gst_app::AppSink,
    dirty: Arc<AtomicBool>,
}

impl FrameExtractor {
    /// Build a sink producing frames in the configured format and size
    pub fn new(config: &PlayerConfig) -> Result<Self> {
        let appsink = gst_app::AppSink::builder()
            .caps(&video_caps(config)?)
            .max_buffers(1)
            .drop(true)
            .build();

        let dirty = Arc::new(AtomicBool::new(false));

        let on_sample = dirty.clone();
        let on_preroll = dirty.clone();
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |_| {
                    on_sample.store(true, Ordering::Release);
                    Ok(gst::FlowSuccess::Ok)
                })
                .new_preroll(move |_| {
                    on_preroll.store(true, Ordering::Release);
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        Ok(Self { appsink, dirty })
    }

    /// The element to install as the pipeline's video sink
    pub fn sink(&self) -> &gst_app::AppSink {
        &self.appsink
    }

    /// Negotiated frame size, once caps are known
    pub fn dimensions(&self) -> Option<(i32, i32)> {
        let caps = self.appsink.static_pad("sink")?.current_caps()?;
        let info = gst_video::VideoInfo::from_caps(&caps).ok()?;
        Some((info.width() as i32, info.height() as i32))
    }

    /// Hand the newest frame to `consumer`. The buffer stays mapped only for
    /// the duration of the call.
    pub fn extract(&self, consumer: &mut dyn FnMut(&[u8])) -> bool {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return false;
        }

        let sample = self
            .appsink
            .try_pull_sample(gst::ClockTime::ZERO)
            .or_else(|| self.appsink.try_pull_preroll(gst::ClockTime::ZERO));

        let Some(sample) = sample else {
            return false;
        };
        let Some(buffer) = sample.buffer() else {
            debug!("Sample without buffer");
            return false;
        };

        let map = match buffer.map_readable() {
            Ok(map) => map,
            Err(e) => {
                debug!("Failed to map frame: {e}");
                return false;
            }
        };

        consumer(map.as_slice());
        true
    }
}

/// Raw video caps for the sink: the configured format, scaled when a size is set
pub fn video_caps(config: &PlayerConfig) -> Result<gst::Caps> {
    let format = gst_video::VideoFormat::from_string(&config.format);
    if format == gst_video::VideoFormat::Unknown {
        return Err(Error::Open(format!("unsupported video format '{}'", config.format)));
    }

    let mut builder = gst_video::VideoCapsBuilder::new().format(format);
    if let Some(width) = config.width {
        builder = builder.width(width as i32);
    }
    if let Some(height) = config.height {
        builder = builder.height(height as i32);
    }

    Ok(builder.build())
}
