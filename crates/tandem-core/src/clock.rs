//! Clock Coordinator
//!
//! Binds the pipeline to a clock that is also served to the network, and
//! rebases the pipeline on it so that every peer slaved to the same clock
//! computes the same running time.
//!
//! The binding is re-derived on every setup rather than cached: the clock
//! identity changes across pipeline stop/restart, and recomputing the base
//! time from the current clock reading keeps drift from accumulating when
//! setup is retried after a disconnect.

use crate::engine::{EngineClock, MediaEngine};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A pipeline clock together with the provider serving it
pub struct ClockBinding<C, P> {
    clock: C,
    // Held only to keep the provider alive; dropping it stops serving the clock.
    _provider: P,
}

impl<C, P> ClockBinding<C, P> {
    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Owns the shared clock binding of a network player
pub struct ClockCoordinator<E: MediaEngine> {
    address: String,
    port: u16,
    timeout: Duration,
    binding: Option<ClockBinding<E::Clock, E::Provider>>,
}

impl<E: MediaEngine> ClockCoordinator<E> {
    pub fn new(address: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            port,
            timeout,
            binding: None,
        }
    }

    /// Acquire the pipeline clock, serve it, and rebase the pipeline on it.
    ///
    /// Any previous binding is released first. Acquisition failures leave
    /// the coordinator unbound and playback continues unsynchronized.
    /// Returns true when a binding is active afterwards.
    pub fn setup(&mut self, engine: &mut E) -> bool {
        if !engine.has_pipeline() {
            error!("setup_clock called without a pipeline");
            return false;
        }

        self.clear(engine);

        let Some(clock) = engine.pipeline_clock() else {
            warn!("Pipeline has no clock, playing unsynchronized");
            return false;
        };

        let provider = match engine.provide_clock(&clock, &self.address, self.port) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(address = %self.address, port = self.port, error = %e, "Network time provider unavailable");
                return false;
            }
        };

        clock.set_timeout(self.timeout);
        self.binding = Some(ClockBinding {
            clock,
            _provider: provider,
        });

        info!(address = %self.address, port = self.port, "Network clock provided");

        self.adjust(engine);
        true
    }

    /// Rebase the pipeline on the bound clock's current time
    pub fn adjust(&self, engine: &mut E) {
        let binding = match &self.binding {
            Some(binding) if engine.has_pipeline() => binding,
            _ => {
                debug_assert!(false, "adjust_clock requires a pipeline and an active binding");
                error!("adjust_clock called without a pipeline or clock binding");
                return;
            }
        };

        let Some(base_time) = binding.clock.time() else {
            warn!("Network clock returned no time");
            return;
        };

        engine.use_clock(&binding.clock);
        engine.clear_start_time();
        engine.set_base_time(base_time);

        debug!(base_time, "Pipeline rebased on network clock");
    }

    /// Release the clock and provider. Returns true if a binding was dropped.
    pub fn clear(&mut self, engine: &E) -> bool {
        if !engine.has_pipeline() {
            error!("clear_clock called without a pipeline");
            return false;
        }

        let cleared = self.binding.take().is_some();
        if cleared {
            debug!("Network clock released");
        }
        cleared
    }

    /// True while a clock and its provider are held
    pub fn is_active(&self) -> bool {
        self.binding.is_some()
    }

    pub fn binding(&self) -> Option<&ClockBinding<E::Clock, E::Provider>> {
        self.binding.as_ref()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
