//! Level-to-PTT decision state machine with hold-time hysteresis and squelch
//! preemption.
//!
//! Each tick re-arms a countdown while loudness stays above threshold, so the
//! output rides through brief dips inside a spoken phrase instead of
//! chattering. Squelch is polled every tick and zeroes the countdown
//! outright; a busy channel cuts transmission immediately, even mid-hold.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::VoxConfig;
use crate::gpio::{Gpio, Pin};
use crate::level::LevelTracker;

/// Decision tick period in milliseconds.
pub const UPDATE_PERIOD_MS: u64 = 100;

/// The VOX decision engine.
///
/// Owns the countdown and last-applied output level; both are touched only
/// inside [`tick`](Self::tick), which the scheduler must never run
/// reentrantly. The engine is plain owned state, so multi-channel or test
/// setups can instantiate as many as they need.
pub struct VoxEngine {
    threshold_dbov: f64,
    hold_ticks: u32,
    ptt_pin: Option<Pin>,
    squelch_pin: Option<Pin>,
    gpio: Box<dyn Gpio + Send>,
    tracker: Arc<LevelTracker>,
    /// Ticks remaining before the output releases.
    ptt_release: u32,
    /// Last level handed to `ptt_set`, for equal-write suppression.
    last_applied: bool,
}

impl VoxEngine {
    pub fn new(config: &VoxConfig, tracker: Arc<LevelTracker>, gpio: Box<dyn Gpio + Send>) -> Self {
        Self {
            threshold_dbov: f64::from(config.threshold),
            hold_ticks: (config.hold_time_ms / UPDATE_PERIOD_MS) as u32,
            ptt_pin: config.ptt_pin,
            squelch_pin: config.squelch_pin,
            gpio,
            tracker,
            ptt_release: 0,
            last_applied: false,
        }
    }

    /// One fixed-period decision pass.
    ///
    /// Idle until the tracker has seen a frame. Squelch wins over loudness;
    /// a qualifying loudness re-arms the full hold window on every tick, not
    /// just on the first.
    pub fn tick(&mut self) {
        let Some(level) = self.tracker.level_dbov() else {
            return;
        };

        if self.squelch() {
            self.ptt_release = 0;
        } else if level > -self.threshold_dbov {
            self.ptt_release = self.hold_ticks;
        }

        if self.ptt_release > 0 {
            self.ptt_set(true);
            self.ptt_release -= 1;
        } else {
            self.ptt_set(false);
        }
    }

    /// Whether the transmit output is currently enabled (logical state, even
    /// with no output pin wired).
    pub fn is_transmitting(&self) -> bool {
        self.last_applied
    }

    /// Zero the countdown and drive the output low. Used at shutdown as the
    /// final deterministic action.
    pub fn force_disable(&mut self) {
        self.ptt_release = 0;
        self.ptt_set(false);
    }

    /// Squelch input, polled synchronously. Unset or failing reads count as
    /// not asserted.
    fn squelch(&self) -> bool {
        let Some(pin) = self.squelch_pin else {
            return false;
        };
        self.gpio.read(pin).unwrap_or_else(|err| {
            debug!("squelch read on pin {pin} failed: {err:#}");
            false
        })
    }

    /// Apply an output level, suppressing writes that would not change it.
    ///
    /// The logical state advances even when no pin is wired or the write
    /// fails, so the machine stays observable without hardware.
    fn ptt_set(&mut self, level: bool) {
        if level == self.last_applied {
            return;
        }
        if let Some(pin) = self.ptt_pin {
            if let Err(err) = self.gpio.write(pin, level) {
                debug!("ptt write on pin {pin} failed: {err:#}");
            }
        }
        self.last_applied = level;
        info!(transmit = level, "ptt {}", if level { "keyed" } else { "released" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::MemoryGpio;
    use crate::level::AudioFrame;
    use proptest::prelude::*;

    const PTT: Pin = 17;
    const SQUELCH: Pin = 27;

    fn config(threshold: u32, hold_time_ms: u64) -> VoxConfig {
        VoxConfig {
            threshold,
            hold_time_ms,
            ptt_pin: Some(PTT),
            squelch_pin: Some(SQUELCH),
        }
    }

    fn engine_with(config: VoxConfig) -> (VoxEngine, Arc<LevelTracker>, MemoryGpio) {
        let tracker = Arc::new(LevelTracker::new());
        let gpio = MemoryGpio::new();
        let engine = VoxEngine::new(&config, tracker.clone(), Box::new(gpio.clone()));
        (engine, tracker, gpio)
    }

    /// Feed a constant-amplitude frame whose RMS lands on `dbov`.
    fn observe_dbov(tracker: &LevelTracker, dbov: f64) {
        let amplitude = 10.0_f32.powf(dbov as f32 / 20.0);
        let samples = vec![amplitude; 160];
        tracker.observe(AudioFrame::F32(&samples));
    }

    #[test]
    fn tick_is_noop_before_first_frame() {
        let (mut engine, _tracker, gpio) = engine_with(config(60, 200));
        for _ in 0..5 {
            engine.tick();
        }
        assert!(!engine.is_transmitting());
        assert!(gpio.writes().is_empty());
    }

    #[test]
    fn hold_window_rides_through_level_dips() {
        // threshold=60, hold=200ms, period=100ms: -50 keys for two ticks,
        // then releases on the third.
        let (mut engine, tracker, gpio) = engine_with(config(60, 200));

        observe_dbov(&tracker, -50.0);
        engine.tick();
        assert!(engine.is_transmitting());
        assert!(gpio.level(PTT));

        observe_dbov(&tracker, -80.0);
        engine.tick();
        assert!(engine.is_transmitting(), "hold keeps ptt keyed");

        engine.tick();
        assert!(!engine.is_transmitting(), "hold expired");
        assert!(!gpio.level(PTT));
    }

    #[test]
    fn qualifying_tick_rearms_full_hold_window() {
        let (mut engine, tracker, gpio) = engine_with(config(60, 200));

        observe_dbov(&tracker, -50.0);
        engine.tick();
        engine.tick();
        // Still above threshold on the second tick, so the window restarts
        // and the first quiet tick rides on the refreshed hold.
        observe_dbov(&tracker, -80.0);
        engine.tick();
        assert!(engine.is_transmitting());
        engine.tick();
        assert!(!engine.is_transmitting());
        assert_eq!(
            gpio.writes(),
            vec![(PTT, true), (PTT, false)],
            "one keyed and one released write across the whole burst"
        );
    }

    #[test]
    fn squelch_preempts_mid_hold() {
        let (mut engine, tracker, gpio) = engine_with(config(60, 200));

        observe_dbov(&tracker, -50.0);
        engine.tick();
        assert!(engine.is_transmitting());

        // Channel goes busy while the local signal still qualifies.
        gpio.set_input(SQUELCH, true);
        engine.tick();
        assert!(!engine.is_transmitting(), "squelch cuts ptt immediately");
        assert!(!gpio.level(PTT));
    }

    #[test]
    fn squelch_release_requires_fresh_qualifying_tick() {
        let (mut engine, tracker, gpio) = engine_with(config(60, 500));

        observe_dbov(&tracker, -50.0);
        engine.tick();
        gpio.set_input(SQUELCH, true);
        engine.tick();
        assert!(!engine.is_transmitting());

        // Squelch drops with the signal still loud: the very next tick
        // qualifies again and re-keys; the countdown was not held over.
        gpio.set_input(SQUELCH, false);
        engine.tick();
        assert!(engine.is_transmitting());

        // But a quiet signal after release stays released; no stale hold.
        gpio.set_input(SQUELCH, true);
        engine.tick();
        gpio.set_input(SQUELCH, false);
        observe_dbov(&tracker, -80.0);
        engine.tick();
        assert!(!engine.is_transmitting());
    }

    #[test]
    fn equal_output_writes_are_suppressed() {
        let (mut engine, tracker, gpio) = engine_with(config(60, 200));

        observe_dbov(&tracker, -80.0);
        for _ in 0..10 {
            engine.tick();
        }
        assert!(
            gpio.writes().is_empty(),
            "released output never rewritten while already released"
        );

        observe_dbov(&tracker, -50.0);
        for _ in 0..10 {
            engine.tick();
        }
        assert_eq!(
            gpio.writes(),
            vec![(PTT, true)],
            "keyed output written exactly once while held"
        );
    }

    #[test]
    fn unset_pins_keep_logical_state_machine_running() {
        let config = VoxConfig {
            threshold: 60,
            hold_time_ms: 200,
            ptt_pin: None,
            squelch_pin: None,
        };
        let (mut engine, tracker, gpio) = engine_with(config);

        observe_dbov(&tracker, -50.0);
        engine.tick();
        assert!(engine.is_transmitting());
        observe_dbov(&tracker, -80.0);
        engine.tick();
        engine.tick();
        assert!(!engine.is_transmitting());
        assert!(gpio.writes().is_empty(), "no pin, no hardware writes");
    }

    #[test]
    fn hold_shorter_than_period_never_latches() {
        let (mut engine, tracker, _gpio) = engine_with(config(60, 50));

        observe_dbov(&tracker, -10.0);
        engine.tick();
        assert!(!engine.is_transmitting());
    }

    #[test]
    fn force_disable_is_idempotent() {
        let (mut engine, tracker, gpio) = engine_with(config(60, 1000));

        observe_dbov(&tracker, -50.0);
        engine.tick();
        engine.force_disable();
        engine.force_disable();
        assert!(!engine.is_transmitting());
        assert_eq!(gpio.writes(), vec![(PTT, true), (PTT, false)]);
    }

    proptest! {
        /// Squelch asserted during a tick always ends that tick released,
        /// whatever the loudness history did to the countdown.
        #[test]
        fn squelch_always_wins(levels in prop::collection::vec(-96.0_f64..0.0, 1..40)) {
            let (mut engine, tracker, gpio) = engine_with(config(60, 1000));
            for level in &levels {
                observe_dbov(&tracker, *level);
                engine.tick();
            }
            gpio.set_input(SQUELCH, true);
            observe_dbov(&tracker, -1.0);
            engine.tick();
            prop_assert!(!engine.is_transmitting());
        }

        /// One qualifying tick keeps the output keyed for the full hold
        /// window even if the level drops to the floor immediately after.
        #[test]
        fn hold_window_is_honored(hold_ticks in 1_u32..20) {
            let (mut engine, tracker, _gpio) =
                engine_with(config(60, u64::from(hold_ticks) * UPDATE_PERIOD_MS));

            observe_dbov(&tracker, -30.0);
            engine.tick();
            observe_dbov(&tracker, -96.0);
            for _ in 1..hold_ticks {
                prop_assert!(engine.is_transmitting());
                engine.tick();
            }
            prop_assert!(engine.is_transmitting());
            engine.tick();
            prop_assert!(!engine.is_transmitting());
        }

        /// The output is keyed iff the countdown was positive during the
        /// tick, for any interleaving of levels and squelch.
        #[test]
        fn output_tracks_countdown(
            steps in prop::collection::vec((-96.0_f64..0.0, any::<bool>()), 1..60)
        ) {
            let (mut engine, tracker, gpio) = engine_with(config(60, 300));
            let mut model_release = 0_u32;
            for (level, squelched) in &steps {
                gpio.set_input(SQUELCH, *squelched);
                observe_dbov(&tracker, *level);
                engine.tick();

                if *squelched {
                    model_release = 0;
                } else if *level > -60.0 {
                    model_release = 3;
                }
                let expect_keyed = model_release > 0;
                if expect_keyed {
                    model_release -= 1;
                }
                prop_assert_eq!(engine.is_transmitting(), expect_keyed);
            }
        }
    }
}
