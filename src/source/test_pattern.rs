//! Synthetic test-pattern source.
//!
//! Produces deterministic frames without any producer process, so hosts and
//! tests can exercise the capture loop end to end. Payloads are not real
//! JPEGs; they only carry the terminator the rest of the pipeline keys on.

use crate::error::{Result, SourceError};
use crate::source::{FillStatus, FourCc, VideoSource};
use crate::telemetry::{TelemetrySink, Throughput};

#[derive(Clone, Debug)]
pub struct TestPatternConfig {
    /// Length of each synthetic frame, terminator included.
    pub frame_len: usize,
}

impl Default for TestPatternConfig {
    fn default() -> Self {
        Self { frame_len: 4096 }
    }
}

pub struct TestPatternSource {
    config: TestPatternConfig,
    stats: Throughput,
    frame_count: u64,
    streaming: bool,
    frame_rate: u32,
}

impl TestPatternSource {
    pub fn new(config: TestPatternConfig) -> Self {
        Self {
            config,
            stats: Throughput::new(),
            frame_count: 0,
            streaming: false,
            frame_rate: 0,
        }
    }

    pub fn frames_produced(&self) -> u64 {
        self.frame_count
    }
}

impl VideoSource for TestPatternSource {
    fn set_format(&mut self, fourcc: FourCc) -> Result<()> {
        if fourcc != FourCc::MJPG {
            return Err(SourceError::InvalidFormat { fourcc });
        }
        Ok(())
    }

    fn set_frame_rate(&mut self, fps: u32) -> Result<()> {
        self.frame_rate = fps;
        Ok(())
    }

    fn stream_on(&mut self) -> Result<()> {
        self.streaming = true;
        Ok(())
    }

    fn stream_off(&mut self) -> Result<()> {
        self.streaming = false;
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn fill_buffer(&mut self, dest: &mut [u8]) -> Result<FillStatus> {
        let len = self.config.frame_len;
        if len > dest.len() {
            return Err(SourceError::OversizedFrame {
                needed: len,
                capacity: dest.len(),
            });
        }

        self.frame_count += 1;
        // Pattern varies per frame so consumers can tell frames apart.
        for (i, byte) in dest[..len - 2].iter_mut().enumerate() {
            *byte = ((i as u64 + self.frame_count) % 0xD9) as u8;
        }
        dest[len - 2] = 0xFF;
        dest[len - 1] = 0xD9;

        self.stats.record_frame(len);
        Ok(FillStatus::Frame(len))
    }

    fn set_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.stats.set_sink(sink);
    }
}
