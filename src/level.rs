//! Frame loudness tracking so the decision loop always reads the newest level.
//!
//! One scalar per frame, most-recent-wins. The audio pipeline calls
//! [`LevelTracker::observe`] on its delivery thread while the decision tick
//! reads concurrently, so the level crosses threads as a single atomic word.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::debug;

/// Quietest reportable level in dBov.
pub const LEVEL_FLOOR_DBOV: f64 = -96.0;
/// Digital full scale in dBov.
pub const LEVEL_CEIL_DBOV: f64 = 0.0;

/// Keeps `log10` defined for all-zero frames; clamped to the floor anyway.
const RMS_EPSILON: f64 = 1e-9;

/// One frame of host-delivered audio, tagged with its sample encoding.
///
/// Loudness is computed over whatever interleaving the host uses; channel
/// layout does not matter for an RMS level.
#[derive(Debug, Clone, Copy)]
pub enum AudioFrame<'a> {
    /// Signed 16-bit PCM.
    S16(&'a [i16]),
    /// Signed 32-bit PCM.
    S32(&'a [i32]),
    /// 32-bit float PCM in [-1.0, 1.0].
    F32(&'a [f32]),
}

impl AudioFrame<'_> {
    /// Number of samples in the frame.
    pub fn len(&self) -> usize {
        match self {
            AudioFrame::S16(samples) => samples.len(),
            AudioFrame::S32(samples) => samples.len(),
            AudioFrame::F32(samples) => samples.len(),
        }
    }

    /// True when the frame carries no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean of squared full-scale-normalized samples.
    fn normalized_energy(&self) -> f64 {
        let sum: f64 = match self {
            AudioFrame::S16(samples) => samples
                .iter()
                .map(|s| {
                    let x = f64::from(*s) / -f64::from(i16::MIN);
                    x * x
                })
                .sum(),
            AudioFrame::S32(samples) => samples
                .iter()
                .map(|s| {
                    let x = f64::from(*s) / -(i32::MIN as f64);
                    x * x
                })
                .sum(),
            AudioFrame::F32(samples) => samples
                .iter()
                .map(|s| {
                    let x = f64::from(*s);
                    x * x
                })
                .sum(),
        };
        sum / self.len() as f64
    }

    /// RMS loudness of the frame in dBov, clamped to
    /// [[`LEVEL_FLOOR_DBOV`], [`LEVEL_CEIL_DBOV`]].
    pub fn loudness_dbov(&self) -> f64 {
        let rms = self.normalized_energy().sqrt().max(RMS_EPSILON);
        (20.0 * rms.log10()).clamp(LEVEL_FLOOR_DBOV, LEVEL_CEIL_DBOV)
    }
}

/// Latest-value-wins loudness store shared between the audio thread and the
/// decision tick.
///
/// The decision loop must stay idle until the pipeline has delivered at
/// least one frame, so the tracker also records a started flag; a reader
/// sees `None` until then.
pub struct LevelTracker {
    level_bits: AtomicU64,
    started: AtomicBool,
}

impl LevelTracker {
    pub fn new() -> Self {
        Self {
            level_bits: AtomicU64::new(LEVEL_FLOOR_DBOV.to_bits()),
            started: AtomicBool::new(false),
        }
    }

    /// Record the loudness of one incoming frame, overwriting the previous
    /// value. Empty frames are rejected without touching state.
    pub fn observe(&self, frame: AudioFrame<'_>) {
        if frame.is_empty() {
            debug!("discarding empty audio frame");
            return;
        }
        let dbov = frame.loudness_dbov();
        self.level_bits.store(dbov.to_bits(), Ordering::Release);
        self.started.store(true, Ordering::Release);
    }

    /// Latest observed loudness in dBov, or `None` before the first frame.
    pub fn level_dbov(&self) -> Option<f64> {
        if !self.started.load(Ordering::Acquire) {
            return None;
        }
        Some(f64::from_bits(self.level_bits.load(Ordering::Acquire)))
    }
}

impl Default for LevelTracker {
    fn default() -> Self {
        Self::new()
    }
}
