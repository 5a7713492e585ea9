//! Network Player Server
//!
//! A [`Player`] whose pipeline runs on a clock served to the network, and
//! which broadcasts its transport state to peers. Seeks are deferred to the
//! pump and applied by shifting the base time while the pipeline sits in
//! `Ready`, so peers slaved to the same clock stay aligned.
//!
//! Like the plain player, the server is single-threaded: drive it by calling
//! [`PlayerServer::update`] once per host frame.

use crate::{
    clock::ClockCoordinator,
    config::ServerConfig,
    engine::{EngineClock, MediaEngine},
    hooks::PlayerHooks,
    player::Player,
    protocol::{Command, HeartbeatSnapshot, Message},
    reconciler::{shifted_base_time, Reconciler, SeekStep, StateReaction},
    transport::{Transport, UdpTransport},
    types::*,
    Result,
};
use tracing::{debug, error, info, warn};

/// Inbound records handled per update
const MAX_MESSAGES_PER_UPDATE: usize = 64;

/// Player broadcasting a shared clock and heartbeats to peers
pub struct PlayerServer<E: MediaEngine, H: PlayerHooks = (), T: Transport = UdpTransport> {
    player: Player<E, H>,
    clock: ClockCoordinator<E>,
    reconciler: Reconciler,
    transport: Option<T>,
    config: ServerConfig,
    // Set by a restart from the beginning; the clock is rebound once the
    // pipeline is back in `Playing`.
    rebind_on_play: bool,
}

impl<E: MediaEngine, H: PlayerHooks, T: Transport> PlayerServer<E, H, T> {
    /// Create a server. When multicast is enabled the default group is
    /// joined once; failing that, the server stays usable in local-only mode.
    pub fn new(engine: E, hooks: H, config: ServerConfig) -> Self {
        let reconciler = Reconciler::new(config.heartbeat_frequency)
            .with_max_seek_retries(config.max_seek_retries);

        let mut server = Self {
            player: Player::new(engine, hooks),
            clock: ClockCoordinator::new(
                config.clock_address.clone(),
                config.clock_port,
                config.clock_timeout(),
            ),
            reconciler,
            transport: None,
            config,
            rebind_on_play: false,
        };

        if server.config.multicast_enabled {
            let address = server.config.multicast_address.clone();
            let port = server.config.multicast_port;

            if let Err(e) = server.connect(&address, port) {
                warn!(address = %address, port, error = %e, "Player was unable to join the default multicast group");
            }
        }

        server
    }

    /// Use an already connected transport
    pub fn with_transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Open a channel to a group or peer, replacing the current one
    pub fn connect(&mut self, address: &str, port: u16) -> Result<()> {
        let transport = T::connect(address, port)?;
        self.transport = Some(transport);
        Ok(())
    }

    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!("Transport disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Send a record to peers; dropped when disconnected
    pub fn send(&mut self, payload: &str) {
        match self.transport.as_mut() {
            Some(transport) => {
                if let Err(e) = transport.send(payload) {
                    debug!(error = %e, "Dropping outbound record");
                }
            }
            None => debug!(payload, "Not connected, dropping outbound record"),
        }
    }

    // -------------------------------------------------------------------------
    // Media lifecycle
    // -------------------------------------------------------------------------

    /// Open media and bind it to the network clock
    pub fn open(&mut self, path: &str) -> Result<()> {
        self.player.open(path)?;
        self.setup_clock();
        Ok(())
    }

    /// Open media with explicit frame options and bind it to the network clock
    pub fn open_with(&mut self, path: &str, config: PlayerConfig) -> Result<()> {
        self.player.open_with(path, config)?;
        self.setup_clock();
        Ok(())
    }

    pub fn close(&mut self) {
        self.rebind_on_play = false;
        self.on_before_close();
        self.player.close();
    }

    /// Start playback, re-binding the network clock if a stop released it
    pub fn play(&mut self) {
        if !self.clock.is_active() && self.player.engine().has_pipeline() {
            self.setup_clock();
        }
        self.player.play();
    }

    pub fn pause(&mut self) {
        self.player.pause();
    }

    pub fn stop(&mut self) {
        self.player.stop();
    }

    /// Play again from the beginning. The stop releases the clock once the
    /// pipeline reports `Ready`, so it is rebound on the way back to `Playing`.
    pub fn replay(&mut self) {
        self.stop();
        self.play();
        self.rebind_on_play = true;
    }

    /// Pump the server: reconciliation first, then frames and the
    /// `on_update` hook, then inbound records.
    pub fn update(&mut self) {
        self.on_before_update();
        self.player.finish_update();
        self.poll_messages();
    }

    /// Request a seek, applied on a later update once the pipeline is `Ready`
    pub fn set_time(&mut self, time: f64) {
        let duration = self.player.duration();
        let state = self.player.engine().state();
        self.reconciler.set_time(time, duration, state);
    }

    // -------------------------------------------------------------------------
    // Clock coordination
    // -------------------------------------------------------------------------

    /// Bind the pipeline to a freshly served network clock, releasing the
    /// previous binding first
    pub fn setup_clock(&mut self) -> bool {
        self.clear_clock();

        let bound = self.clock.setup(self.player.engine_mut());
        if bound {
            self.player.hooks_mut().on_clock_setup();
        }
        bound
    }

    /// Rebase the pipeline on the bound clock
    pub fn adjust_clock(&mut self) {
        self.clock.adjust(self.player.engine_mut());
    }

    /// Release the network clock binding (idempotent)
    pub fn clear_clock(&mut self) {
        if self.clock.clear(self.player.engine()) {
            self.player.hooks_mut().on_clock_clear();
        }
    }

    pub fn is_clock_active(&self) -> bool {
        self.clock.is_active()
    }

    // -------------------------------------------------------------------------
    // Lifecycle hooks
    // -------------------------------------------------------------------------

    fn on_before_close(&mut self) {
        if self.player.engine().has_pipeline() {
            self.clear_clock();
        }
    }

    fn on_before_update(&mut self) {
        if !self.player.engine().has_pipeline() {
            error!("update called without a pipeline");
            return;
        }

        let iteration = self.player.iterate();
        if iteration.looped {
            self.rebind_on_play = true;
        }
        for (old, new) in iteration.transitions {
            self.on_state_changed(old, new);
        }

        if self.reconciler.tick_heartbeat() {
            self.dispatch_heartbeat();
        }

        match self.reconciler.seek_step(self.player.engine().state()) {
            SeekStep::Idle => {}
            SeekStep::Stop => {
                debug!(retries = self.reconciler.seek_retries(), "Seek pending, stopping pipeline");
                self.player.stop();
            }
            SeekStep::Apply { target, restore } => self.apply_seek(target, restore),
        }
    }

    fn on_state_changed(&mut self, old: PlaybackState, new: PlaybackState) {
        let position = self.player.time();

        match self.reconciler.on_state_changed(old, new, position) {
            StateReaction::ClearClock => self.clear_clock(),
            StateReaction::CapturedPosition(position) => {
                debug!(position, "Captured position on pause");
            }
            StateReaction::Reseek(position) => {
                debug!(position, "Restoring position after pause");
                self.set_time(position);
            }
            StateReaction::None => {}
        }

        if new == PlaybackState::Playing && self.rebind_on_play {
            self.rebind_on_play = false;
            if !self.clock.is_active() {
                debug!("Restarted from the beginning, rebinding network clock");
                self.setup_clock();
            }
        }
    }

    /// Shift the base time so the running time lands on `target`, then
    /// restore the state captured with the request.
    fn apply_seek(&mut self, target: f64, restore: PlaybackState) {
        let engine = self.player.engine_mut();

        // Released at the end of this scope on every path.
        let Some(clock) = engine.pipeline_clock() else {
            warn!(target, "Pipeline has no clock, retrying seek");
            return;
        };
        let Some(now) = clock.time() else {
            warn!(target, "Clock returned no time, retrying seek");
            return;
        };

        let base_time = shifted_base_time(now, engine.base_time(), target);
        engine.set_base_time(base_time);

        if let Err(e) = self.player.set_state(restore) {
            warn!(error = %e, state = %restore, "Failed to restore state after seek");
        }

        self.reconciler.complete_seek();

        info!(target, state = %restore, base_time, "Seek applied");
    }

    /// Current transport snapshot
    pub fn heartbeat(&self) -> HeartbeatSnapshot {
        HeartbeatSnapshot {
            time: self.player.time(),
            volume: self.player.volume(),
            muted: self.player.is_muted(),
            state: self.player.state(),
            base_time: self.player.engine().base_time(),
        }
    }

    /// Serialize and send a heartbeat now
    pub fn dispatch_heartbeat(&mut self) {
        if !self.player.engine().has_pipeline() {
            error!("dispatch_heartbeat called without a pipeline");
            return;
        }

        let record = self.heartbeat().encode();
        debug!(record = %record, "Heartbeat");
        self.send(&record);
    }

    // -------------------------------------------------------------------------
    // Inbound records
    // -------------------------------------------------------------------------

    fn poll_messages(&mut self) {
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        let inbox: Vec<String> = std::iter::from_fn(|| transport.poll())
            .take(MAX_MESSAGES_PER_UPDATE)
            .collect();

        for payload in inbox {
            self.player.hooks_mut().on_message(&payload);

            if !self.config.accept_commands {
                continue;
            }

            match Message::parse(&payload) {
                Ok(message) => self.apply_message(&message),
                Err(e) => debug!(error = %e, "Ignoring record"),
            }
        }
    }

    /// Apply a peer's command to this server. Heartbeats are ignored: the
    /// server owns the clock.
    pub fn apply_message(&mut self, message: &Message) {
        let Message::Command(command) = message else {
            return;
        };

        debug!(?command, "Applying command");

        match *command {
            Command::Play => self.play(),
            Command::Pause => self.pause(),
            Command::Stop => self.stop(),
            Command::Seek(time) => self.set_time(time),
            Command::Volume(volume) => self.set_volume(volume),
            Command::Mute(muted) => self.set_mute(muted),
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Change the heartbeat period; a new value restarts the count
    pub fn set_heartbeat_frequency(&mut self, frequency: u32) {
        self.reconciler.set_heartbeat_frequency(frequency);
        self.config.heartbeat_frequency = self.reconciler.heartbeat_frequency();
    }

    pub fn heartbeat_frequency(&self) -> u32 {
        self.reconciler.heartbeat_frequency()
    }

    pub fn heartbeat_counter(&self) -> u32 {
        self.reconciler.heartbeat_counter()
    }

    pub fn pending_seek(&self) -> Option<f64> {
        self.reconciler.pending_seek()
    }

    pub fn pending_state(&self) -> PlaybackState {
        self.reconciler.pending_state()
    }

    pub fn pending_state_seek(&self) -> Option<f64> {
        self.reconciler.pending_state_seek()
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.player.set_volume(volume);
    }

    pub fn volume(&self) -> f64 {
        self.player.volume()
    }

    pub fn set_mute(&mut self, muted: bool) {
        self.player.set_mute(muted);
    }

    pub fn is_muted(&self) -> bool {
        self.player.is_muted()
    }

    pub fn set_loop(&mut self, on: bool) {
        self.player.set_loop(on);
    }

    pub fn is_looping(&self) -> bool {
        self.player.is_looping()
    }

    pub fn state(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn time(&self) -> f64 {
        self.player.time()
    }

    pub fn duration(&self) -> f64 {
        self.player.duration()
    }

    pub fn width(&self) -> i32 {
        self.player.width()
    }

    pub fn height(&self) -> i32 {
        self.player.height()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn player(&self) -> &Player<E, H> {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player<E, H> {
        &mut self.player
    }

    pub fn hooks(&self) -> &H {
        self.player.hooks()
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        self.player.hooks_mut()
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn transport_mut(&mut self) -> Option<&mut T> {
        self.transport.as_mut()
    }
}

impl<E: MediaEngine, H: PlayerHooks, T: Transport> Drop for PlayerServer<E, H, T> {
    fn drop(&mut self) {
        self.close();
    }
}
