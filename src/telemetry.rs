//! Optional local trace logging for debugging and field triage.
//!
//! Writes JSONL events to a file instead of stderr so a switch wired into a
//! live audio pipeline can be inspected after the fact without disturbing
//! the host process's output.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_subscriber::fmt::time::UtcTime;

use crate::config::VoxCli;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Trace log destination; override with `VOXSWITCH_TRACE_LOG`.
pub fn trace_log_path() -> PathBuf {
    env::var("VOXSWITCH_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("voxswitch_trace.jsonl"))
}

#[inline]
fn tracing_enabled(cli: &VoxCli) -> bool {
    cli.logs && !cli.no_logs
}

fn init_tracing_once(cli: &VoxCli, once: &OnceLock<()>) {
    if !tracing_enabled(cli) {
        return;
    }

    let _ = once.get_or_init(|| {
        let path = trace_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Install the trace subscriber once per process, honoring the log flags.
pub fn init_tracing(cli: &VoxCli) {
    init_tracing_once(cli, &TRACING_INIT);
}
