//! Video sources.
//!
//! A video source is any producer of raw capture buffers for the gadget's
//! streaming pipeline. The [`VideoSource`] trait is the capability set the
//! surrounding capture loop programs against; the concrete kind is chosen at
//! construction:
//! - [`MjpegPipeSource`]: frames extracted from a named pipe (the real path)
//! - [`TestPatternSource`]: deterministic synthetic frames (no producer needed)
//!
//! Sources are single-threaded and caller-driven: no internal threads, no
//! locks, one `fill_buffer` call per requested frame. Callers that want
//! concurrency must serialize calls themselves.

pub mod mjpeg_pipe;
pub mod test_pattern;

pub use mjpeg_pipe::{MjpegPipeSource, PipeConfig, ReadMode};
pub use test_pattern::{TestPatternConfig, TestPatternSource};

use std::fmt;

use crate::error::{Result, SourceError};
use crate::telemetry::TelemetrySink;

/// Four-character code identifying a pixel or encoding format.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FourCc([u8; 4]);

impl FourCc {
    /// Motion JPEG, the only encoding these sources produce.
    pub const MJPG: FourCc = FourCc(*b"MJPG");

    pub const fn new(code: [u8; 4]) -> Self {
        FourCc(code)
    }

    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{b:02x}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}

/// Outcome of a `fill_buffer` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillStatus {
    /// A complete frame of this many bytes was copied into the destination.
    Frame(usize),
    /// The producer has not yet written enough data for a frame. Normal; try
    /// again later (or poll the channel in non-blocking setups).
    Pending,
}

/// Capability set exposed to the capture pipeline.
///
/// Lifecycle mapping: construction stores configuration and performs no I/O;
/// teardown is `Drop` and is safe even when `fill_buffer` was never called.
pub trait VideoSource: Send {
    /// Accepts only the single supported encoding; `InvalidFormat` otherwise,
    /// leaving all state unchanged.
    fn set_format(&mut self, fourcc: FourCc) -> Result<()>;

    /// Stores the requested rate. Pacing is not enforced by the sources in
    /// this crate; producers set the actual cadence.
    fn set_frame_rate(&mut self, fps: u32) -> Result<()>;

    /// Flips the streaming flag only. Does not interrupt an in-flight
    /// blocking read; callers must stop issuing `fill_buffer` after this.
    fn stream_on(&mut self) -> Result<()>;
    fn stream_off(&mut self) -> Result<()>;
    fn is_streaming(&self) -> bool;

    /// These sources own no device buffer memory.
    fn alloc_buffers(&mut self, _count: u32) -> Result<()> {
        Err(SourceError::Unsupported("alloc_buffers"))
    }

    fn export_buffers(&mut self) -> Result<()> {
        Err(SourceError::Unsupported("export_buffers"))
    }

    /// Nothing to free; succeeds so teardown paths stay uniform.
    fn free_buffers(&mut self) -> Result<()> {
        Ok(())
    }

    /// The single data-producing operation: copies the next complete frame
    /// into `dest` when one can be assembled.
    fn fill_buffer(&mut self, dest: &mut [u8]) -> Result<FillStatus>;

    /// Attaches the telemetry sink that receives throughput reports.
    fn set_sink(&mut self, sink: Box<dyn TelemetrySink>);
}
