//! Tandem Desktop - GStreamer engine for synchronized playback
//!
//! Native engine adapter with:
//! - `gstreamer-player` playback, signals drained on the caller's thread
//! - Raw frame delivery through an `appsink` (any raw format, optional scaling)
//! - Pipeline clock served to peers with `gstreamer-net`
//!
//! # Example
//!
//! ```rust,no_run
//! use tandem_core::{PlayerServer, ServerConfig};
//! use tandem_desktop::GstEngine;
//!
//! let engine = GstEngine::new().unwrap();
//! let mut server: PlayerServer<GstEngine> =
//!     PlayerServer::new(engine, (), ServerConfig::default());
//! server.open("/path/to/video.mp4").unwrap();
//! server.play();
//!
//! loop {
//!     server.update();
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! ```

pub mod controls;
pub mod engine;
pub mod frame;

pub use controls::ControlAction;
pub use engine::{check_gstreamer_installation, GStreamerInfo, GstEngine, NetClock};
pub use frame::FrameExtractor;
