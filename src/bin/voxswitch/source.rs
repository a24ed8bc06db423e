//! Frame sources for the demo host: paced stdin PCM, or the default input
//! device behind the `mic` feature.

use std::io::{self, Read};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::ValueEnum;
use voxswitch::{AudioFrame, VoxSwitch};

/// Sample encoding of a raw PCM stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub(crate) enum PcmFormat {
    /// Signed 16-bit little-endian.
    #[default]
    S16,
    /// 32-bit float little-endian.
    F32,
}

impl PcmFormat {
    fn bytes_per_sample(self) -> usize {
        match self {
            PcmFormat::S16 => 2,
            PcmFormat::F32 => 4,
        }
    }
}

/// Prints transmit transitions exactly once per edge.
pub(crate) struct TxReporter {
    last: bool,
}

impl TxReporter {
    pub(crate) fn new() -> Self {
        Self { last: false }
    }

    pub(crate) fn update(&mut self, transmitting: bool) {
        if transmitting != self.last {
            println!(
                "transmit {}",
                if transmitting { "keyed" } else { "released" }
            );
            self.last = transmitting;
        }
    }
}

/// Feed raw PCM from stdin, paced at real time so the decision ticks see the
/// stream the way a live pipeline would deliver it. Returns at EOF.
pub(crate) fn run_stdin(
    switch: &VoxSwitch,
    format: PcmFormat,
    sample_rate: u32,
    frame_ms: u64,
    report: &mut TxReporter,
) -> Result<()> {
    let tracker = switch.tracker();
    let frame_samples = ((u64::from(sample_rate) * frame_ms) / 1000).max(1) as usize;
    let mut buf = vec![0_u8; frame_samples * format.bytes_per_sample()];
    let mut stdin = io::stdin().lock();

    loop {
        let filled = read_frame(&mut stdin, &mut buf)?;
        if filled == 0 {
            break;
        }
        let bytes = &buf[..filled - filled % format.bytes_per_sample()];
        match format {
            PcmFormat::S16 => {
                let samples: Vec<i16> = bytes
                    .chunks_exact(2)
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect();
                tracker.observe(AudioFrame::S16(&samples));
            }
            PcmFormat::F32 => {
                let samples: Vec<f32> = bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect();
                tracker.observe(AudioFrame::F32(&samples));
            }
        }
        report.update(switch.is_transmitting());
        thread::sleep(Duration::from_millis(frame_ms));
    }
    Ok(())
}

/// Fill `buf` as far as the reader allows; a short count means EOF.
fn read_frame(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Capture from the default input device for a fixed duration.
#[cfg(feature = "mic")]
pub(crate) fn run_mic(switch: &VoxSwitch, duration_s: u64, report: &mut TxReporter) -> Result<()> {
    use anyhow::{bail, Context};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::time::Instant;

    fn stream_error(err: cpal::StreamError) {
        tracing::warn!("input stream error: {err}");
    }

    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("no default audio input device")?;
    let supported = device
        .default_input_config()
        .context("no default input config")?;
    let stream_config: cpal::StreamConfig = supported.config();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::I16 => {
            let tracker = switch.tracker();
            device.build_input_stream(
                &stream_config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    tracker.observe(AudioFrame::S16(data));
                },
                stream_error,
                None,
            )?
        }
        cpal::SampleFormat::F32 => {
            let tracker = switch.tracker();
            device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    tracker.observe(AudioFrame::F32(data));
                },
                stream_error,
                None,
            )?
        }
        other => bail!("unsupported input sample format {other:?}"),
    };
    stream.play()?;

    let deadline = Instant::now() + Duration::from_secs(duration_s);
    while Instant::now() < deadline {
        report.update(switch.is_transmitting());
        thread::sleep(Duration::from_millis(50));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_frame_reports_short_final_frame() {
        let data = [1_u8, 2, 3];
        let mut reader = &data[..];
        let mut buf = [0_u8; 2];
        assert_eq!(read_frame(&mut reader, &mut buf).expect("read"), 2);
        assert_eq!(read_frame(&mut reader, &mut buf).expect("read"), 1);
        assert_eq!(read_frame(&mut reader, &mut buf).expect("read"), 0);
    }

    #[test]
    fn reporter_prints_only_on_edges() {
        let mut reporter = TxReporter::new();
        reporter.update(false);
        assert!(!reporter.last);
        reporter.update(true);
        assert!(reporter.last);
        reporter.update(true);
        assert!(reporter.last);
    }
}
