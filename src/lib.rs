//! MJPEG named-pipe frame source for UVC gadget capture pipelines.
//!
//! An external producer writes back-to-back JPEG images into a named pipe;
//! this crate turns that continuous byte stream into discrete frames behind a
//! pluggable [`VideoSource`] abstraction, for a capture loop that requests one
//! frame at a time.
//!
//! # Module structure
//!
//! - `scan`: scan buffer + incremental terminator scanner (the core)
//! - `source`: the `VideoSource` capability trait and its implementations
//! - `telemetry`: windowed throughput reporting through an injected sink
//! - `error`: typed error taxonomy
//! - `config`: file/env configuration for the `pipecapd` daemon
//!
//! # Concurrency model
//!
//! Cooperative and single-threaded: sources have no internal threads and take
//! no locks. In the default blocking read mode, `fill_buffer` may park its
//! thread until the producer writes — run the source on a dedicated I/O
//! thread. In non-blocking mode an empty pipe yields
//! [`FillStatus::Pending`](source::FillStatus) instead.

pub mod config;
pub mod error;
pub mod scan;
pub mod source;
pub mod telemetry;

pub use config::{PipecapConfig, SourceKind};
pub use error::SourceError;
pub use scan::{ScanBuffer, CHUNK_SIZE, SCAN_CAPACITY};
pub use source::{
    FillStatus, FourCc, MjpegPipeSource, PipeConfig, ReadMode, TestPatternConfig,
    TestPatternSource, VideoSource,
};
pub use telemetry::{
    LogSink, TelemetrySink, Throughput, ThroughputReport, REPORT_INTERVAL_FRAMES,
};
