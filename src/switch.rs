//! Switch lifecycle that wires the tracker, engine, and tick scheduler
//! together for a host process.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::config::VoxConfig;
use crate::engine::{VoxEngine, UPDATE_PERIOD_MS};
use crate::gpio::Gpio;
use crate::level::LevelTracker;
use crate::ticker::Ticker;

/// A complete voice-operated switch: level tracker, decision engine, and
/// periodic scheduler.
///
/// The host hands frames to [`tracker`](Self::tracker) from its audio
/// pipeline; [`start`](Self::start) begins the decision ticks and
/// [`stop`](Self::stop) halts them and forces the output low. Dropping the
/// switch stops it.
pub struct VoxSwitch {
    tracker: Arc<LevelTracker>,
    engine: Arc<Mutex<VoxEngine>>,
    ticker: Option<Ticker>,
}

impl VoxSwitch {
    /// Build a switch from sanitized settings and a GPIO backend.
    pub fn new(config: VoxConfig, gpio: Box<dyn Gpio + Send>) -> Self {
        let config = config.sanitized();
        info!(
            threshold = config.threshold,
            hold_time_ms = config.hold_time_ms,
            ptt_pin = config.ptt_pin,
            squelch_pin = config.squelch_pin,
            "loading vox switch"
        );
        let tracker = Arc::new(LevelTracker::new());
        let engine = VoxEngine::new(&config, tracker.clone(), gpio);
        Self {
            tracker,
            engine: Arc::new(Mutex::new(engine)),
            ticker: None,
        }
    }

    /// Handle the host audio pipeline uses to deliver frames.
    pub fn tracker(&self) -> Arc<LevelTracker> {
        self.tracker.clone()
    }

    /// Logical transmit state, pin or no pin.
    pub fn is_transmitting(&self) -> bool {
        self.lock_engine().is_transmitting()
    }

    /// Begin periodic decision ticks. Already-started is a no-op; failing to
    /// spawn the tick thread is the only fatal error.
    pub fn start(&mut self) -> Result<()> {
        if self.ticker.is_some() {
            return Ok(());
        }
        let engine = self.engine.clone();
        let ticker = Ticker::spawn(
            "vox-tick",
            Duration::from_millis(UPDATE_PERIOD_MS),
            move || {
                engine
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .tick();
            },
        )?;
        self.ticker = Some(ticker);
        Ok(())
    }

    /// Halt the ticks, then force the transmit output low as the final
    /// deterministic action.
    pub fn stop(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
        self.lock_engine().force_disable();
    }

    fn lock_engine(&self) -> MutexGuard<'_, VoxEngine> {
        self.engine
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for VoxSwitch {
    fn drop(&mut self) {
        self.stop();
    }
}
