//! Fixed-rate tick scheduling on a dedicated worker thread.
//!
//! The periodic contract the decision engine needs: ticks fire at a fixed
//! rate, exactly one at a time, and a tick that would overlap a slow
//! predecessor is skipped rather than queued (the tick channel buffers at
//! most one pending tick). Stopping signals the worker and joins it with a
//! bounded wait.

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, select, Sender};
use tracing::debug;

const JOIN_POLL_MS: u64 = 5;
const JOIN_TIMEOUT_MS: u64 = 1000;

/// Handle to a running periodic worker. Dropping it stops the worker.
pub struct Ticker {
    name: String,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a worker that invokes `tick_fn` every `period` until stopped.
    ///
    /// Spawn failure is the one fatal error in the whole subsystem; the host
    /// must treat it as initialization failure.
    pub fn spawn(
        name: &str,
        period: Duration,
        mut tick_fn: impl FnMut() + Send + 'static,
    ) -> Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticks = crossbeam_channel::tick(period);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || loop {
                select! {
                    recv(ticks) -> msg => {
                        // Stop takes priority over a tick buffered while the
                        // previous tick body was still running.
                        if msg.is_err() || stop_rx.try_recv().is_ok() {
                            break;
                        }
                        tick_fn();
                    }
                    recv(stop_rx) -> _ => break,
                }
            })
            .with_context(|| format!("failed to spawn {name} tick thread"))?;
        Ok(Self {
            name: name.to_string(),
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Signal the worker and wait briefly for it to exit. Idempotent.
    pub fn stop(&mut self) {
        let _ = self.stop_tx.try_send(());
        let Some(handle) = self.handle.take() else {
            return;
        };
        let deadline = Instant::now() + Duration::from_millis(JOIN_TIMEOUT_MS);
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(JOIN_POLL_MS));
        }
        if handle.is_finished() {
            if let Err(err) = handle.join() {
                debug!("{} tick thread panicked during shutdown: {err:?}", self.name);
            }
        } else {
            debug!(
                "{} tick thread did not exit within {JOIN_TIMEOUT_MS}ms; detaching",
                self.name
            );
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
