//! Voice-operated switch (VOX) that keys a push-to-talk line from audio
//! loudness, with squelch preemption.
//!
//! ## Architecture
//!
//! Audio frames arrive asynchronously and update a [`LevelTracker`]; an
//! independent fixed-period tick drives the [`VoxEngine`], which reads the
//! latest loudness and the squelch input and applies the hold-time state
//! machine to the transmit output. The two rates are decoupled on purpose:
//! frames usually arrive much faster than decisions are made.
//!
//! Hardware sits behind the two-operation [`Gpio`] trait, so the whole
//! machine runs (and tests) without pins attached.

pub mod config;
pub mod engine;
pub mod gpio;
pub mod level;
pub mod switch;
pub mod telemetry;
pub mod ticker;

pub use config::{FileConfig, VoxCli, VoxConfig};
pub use engine::{VoxEngine, UPDATE_PERIOD_MS};
pub use gpio::{Gpio, MemoryGpio, Pin};
pub use level::{AudioFrame, LevelTracker};
pub use switch::VoxSwitch;
pub use ticker::Ticker;
