//! Latest-value telemetry state shared between the reader and consumers
//!
//! One mutex covers all four measurement slots; a successful frame is applied
//! in a single critical section. Each channel additionally carries a [`Latch`]
//! that flips exactly once, the first time any valid frame delivers a value
//! for it, so consumers can block until data has ever arrived.

use crate::core::protocol::ObservationUpdate;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

/// One measurement channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Atmospheric pressure (Pa)
    Pressure,
    /// Temperature (degrees Celsius)
    Temperature,
    /// Relative humidity (%)
    Humidity,
    /// CO2 concentration (ppm)
    Co2,
}

/// One-shot readiness signal
///
/// Once set it stays set for the life of the owning session; waiters arriving
/// later return immediately.
#[derive(Debug, Default)]
pub struct Latch {
    set: Mutex<bool>,
    cvar: Condvar,
}

impl Latch {
    /// Latch the signal and wake all waiters. Idempotent.
    pub fn set(&self) {
        let mut set = self.set.lock();
        if !*set {
            *set = true;
            self.cvar.notify_all();
        }
    }

    /// True once [`set`](Self::set) has been called.
    pub fn is_set(&self) -> bool {
        *self.set.lock()
    }

    /// Block until the latch is set or `timeout` elapses.
    ///
    /// Returns whether the latch was set.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut set = self.set.lock();
        if *set {
            return true;
        }
        self.cvar.wait_while_for(&mut set, |set| !*set, timeout);
        *set
    }
}

/// Latest decoded value per channel
///
/// Slots start unset and only ever move to `Some`; the reader overwrites them
/// with each valid frame, consumers read the most recent value.
#[derive(Debug, Default)]
pub struct TelemetryState {
    /// Latest pressure reading (Pa)
    pub pressure_pa: Option<i64>,
    /// Latest temperature reading (degrees Celsius)
    pub temperature_c: Option<f64>,
    /// Latest relative humidity reading (%)
    pub humidity_pct: Option<f64>,
    /// Latest CO2 reading (ppm)
    pub co2_ppm: Option<f64>,
}

/// Telemetry state plus per-channel readiness, shared between the reader
/// worker and any number of consumer threads.
#[derive(Debug, Default)]
pub struct SharedTelemetry {
    /// Measurement slots, all guarded by one lock
    pub state: Mutex<TelemetryState>,
    pressure_ready: Latch,
    temperature_ready: Latch,
    humidity_ready: Latch,
    co2_ready: Latch,
}

impl SharedTelemetry {
    /// Readiness latch for one channel.
    pub fn latch(&self, channel: Channel) -> &Latch {
        match channel {
            Channel::Pressure => &self.pressure_ready,
            Channel::Temperature => &self.temperature_ready,
            Channel::Humidity => &self.humidity_ready,
            Channel::Co2 => &self.co2_ready,
        }
    }

    /// Apply one decoded frame: write every present field under a single
    /// critical section and latch the matching readiness signals.
    pub fn apply(&self, update: &ObservationUpdate) {
        let mut state = self.state.lock();
        if let Some(pressure) = update.pressure_pa {
            state.pressure_pa = Some(pressure);
            self.pressure_ready.set();
        }
        if let Some(temperature) = update.temperature_c {
            state.temperature_c = Some(temperature);
            self.temperature_ready.set();
        }
        if let Some(humidity) = update.humidity_pct {
            state.humidity_pct = Some(humidity);
            self.humidity_ready.set();
        }
        if let Some(co2) = update.co2_ppm {
            state.co2_ppm = Some(co2);
            self.co2_ready.set();
        }
    }
}
