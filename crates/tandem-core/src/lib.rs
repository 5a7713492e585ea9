//! Tandem Core - Network-synchronized playback coordinator
//!
//! This crate provides the engine-agnostic half of Tandem:
//! - A single-thread player facade with a per-frame `update()` pump
//! - A clock coordinator serving the pipeline clock to the network
//! - A reconciler for deferred seeks and heartbeat cadence
//! - The pipe-delimited heartbeat/command protocol
//! - A UDP/multicast transport
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         PlayerServer                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Clock     │  │  Transport   │  │   Protocol   │           │
//! │  │ Coordinator  │  │  Reconciler  │  │  + Transport │           │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘           │
//! │         │                 │                 │                   │
//! │         └─────────────────┼─────────────────┘                   │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │   Player    │ ──── PlayerHooks             │
//! │                    │   Facade    │                              │
//! │                    └──────┬──────┘                              │
//! │                           │                                     │
//! │                    ┌──────┴──────┐                              │
//! │                    │ MediaEngine │  (tandem-desktop: GStreamer) │
//! │                    └─────────────┘                              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod engine;
pub mod hooks;
pub mod player;
pub mod clock;
pub mod reconciler;
pub mod protocol;
pub mod transport;
pub mod server;

pub use error::{Error, Result};
pub use types::*;
pub use config::ServerConfig;
pub use engine::{EngineClock, EngineEvent, MediaEngine};
pub use hooks::PlayerHooks;
pub use player::{Iteration, Player};
pub use clock::{ClockBinding, ClockCoordinator};
pub use reconciler::{Reconciler, SeekStep, StateReaction};
pub use protocol::{Command, HeartbeatSnapshot, Message};
pub use transport::{Transport, UdpTransport};
pub use server::PlayerServer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at startup
pub fn init() {
    tracing::info!(version = VERSION, "Tandem Core initialized");
}
