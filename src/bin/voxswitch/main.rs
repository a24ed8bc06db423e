//! Demo host for the voice-operated switch: resolves configuration, feeds
//! PCM into the level tracker, and reports transmit transitions.
//!
//! The GPIO backend here is the in-memory one, so the binary doubles as a
//! dry-run tool: pipe raw PCM in and watch the keying decisions without any
//! pins attached.

mod source;

use anyhow::Result;
use clap::Parser;
use voxswitch::{telemetry, MemoryGpio, VoxCli, VoxSwitch};

use source::{PcmFormat, TxReporter};

#[derive(Debug, Parser)]
#[command(name = "voxswitch", about = "Voice-operated PTT switch", version)]
struct Cli {
    #[command(flatten)]
    vox: VoxCli,

    /// Sample encoding of the stdin PCM stream
    #[arg(long, value_enum, default_value_t = PcmFormat::S16)]
    format: PcmFormat,

    /// Sample rate of the incoming PCM in Hz
    #[arg(long = "sample-rate", default_value_t = 16_000)]
    sample_rate: u32,

    /// Frame size handed to the level tracker, in milliseconds
    #[arg(long = "frame-ms", default_value_t = 20)]
    frame_ms: u64,

    /// Capture from the default input device instead of stdin
    #[cfg(feature = "mic")]
    #[arg(long, default_value_t = false)]
    mic: bool,

    /// With --mic, stop after this many seconds
    #[cfg(feature = "mic")]
    #[arg(long = "duration-s", default_value_t = 10)]
    duration_s: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(&cli.vox);
    let config = cli.vox.resolved();

    let mut switch = VoxSwitch::new(config, Box::new(MemoryGpio::new()));
    switch.start()?;
    let mut reporter = TxReporter::new();

    #[cfg(feature = "mic")]
    if cli.mic {
        source::run_mic(&switch, cli.duration_s, &mut reporter)?;
        switch.stop();
        reporter.update(switch.is_transmitting());
        return Ok(());
    }

    source::run_stdin(
        &switch,
        cli.format,
        cli.sample_rate,
        cli.frame_ms,
        &mut reporter,
    )?;
    switch.stop();
    reporter.update(switch.is_transmitting());
    Ok(())
}
