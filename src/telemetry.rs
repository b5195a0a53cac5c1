//! Throughput telemetry.
//!
//! Counts completed frames and their bytes, and every
//! [`REPORT_INTERVAL_FRAMES`] frames derives a frames/s and MiB/s rate over
//! the window and hands it to an injected sink. The sink indirection exists so
//! hosts can route rates into their own observability and tests can capture
//! them deterministically; the default sink logs through the `log` facade.

use std::time::Instant;

/// Frames per reporting window. No report is emitted before the window fills.
pub const REPORT_INTERVAL_FRAMES: u64 = 50;

/// One reporting window's worth of throughput.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThroughputReport {
    pub frames_per_sec: f64,
    pub mib_per_sec: f64,
    pub frames: u64,
    pub bytes: u64,
}

/// Receives a report at the end of each window.
pub trait TelemetrySink: Send {
    fn report(&mut self, report: ThroughputReport);
}

/// Default sink: structured line through the `log` facade.
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn report(&mut self, report: ThroughputReport) {
        log::info!(
            "throughput: {:.1} frames/s, {:.3} MiB/s over {} frames",
            report.frames_per_sec,
            report.mib_per_sec,
            report.frames
        );
    }
}

/// Windowed frame/byte counters. Reset at every report.
pub struct Throughput {
    frames: u64,
    bytes: u64,
    window_start: Instant,
    last_sample: Instant,
    sink: Box<dyn TelemetrySink>,
}

impl Throughput {
    pub fn new() -> Self {
        Self::with_sink(Box::new(LogSink))
    }

    pub fn with_sink(sink: Box<dyn TelemetrySink>) -> Self {
        let now = Instant::now();
        Self {
            frames: 0,
            bytes: 0,
            window_start: now,
            last_sample: now,
            sink,
        }
    }

    /// Replaces the sink. Counters and the current window are kept.
    pub fn set_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.sink = sink;
    }

    /// Records one completed frame of `len` bytes. On the 50th frame of the
    /// window, emits a report and rebases the window.
    pub fn record_frame(&mut self, len: usize) {
        self.frames += 1;
        self.bytes += len as u64;
        self.last_sample = Instant::now();

        if self.frames % REPORT_INTERVAL_FRAMES != 0 {
            return;
        }

        let elapsed = self
            .last_sample
            .duration_since(self.window_start)
            .as_secs_f64();
        // A zero-duration window can only happen under test clocks; report
        // zero rather than infinity.
        let (fps, mib) = if elapsed > 0.0 {
            (
                self.frames as f64 / elapsed,
                (self.bytes as f64 / 1024.0 / 1024.0) / elapsed,
            )
        } else {
            (0.0, 0.0)
        };

        self.sink.report(ThroughputReport {
            frames_per_sec: fps,
            mib_per_sec: mib,
            frames: self.frames,
            bytes: self.bytes,
        });

        self.frames = 0;
        self.bytes = 0;
        self.window_start = Instant::now();
    }

    /// Frames recorded in the current window.
    pub fn window_frames(&self) -> u64 {
        self.frames
    }
}

impl Default for Throughput {
    fn default() -> Self {
        Self::new()
    }
}
