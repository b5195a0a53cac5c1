//! MJPEG named-pipe frame source.
//!
//! An external producer writes back-to-back JPEG images into a named pipe;
//! this source extracts them one frame per `fill_buffer` call. All I/O is
//! lazy: construction only stores configuration, and the pipe is opened on the
//! first fill so the gadget can be brought up before the producer exists.
//!
//! The channel is opened with a small handshake: the signal path is opened for
//! writing and immediately closed (this tells the producer a consumer is
//! ready), then the same path is opened for reading. Open failures surface as
//! `ChannelOpenFailure` and are retryable on the next call.

use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::PathBuf;

use crate::error::{Result, SourceError};
use crate::scan::ScanBuffer;
use crate::source::{FillStatus, FourCc, VideoSource};
use crate::telemetry::{TelemetrySink, Throughput};

/// Whether `fill_buffer` may park the calling thread on an empty pipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Reads block until the producer writes. Run the source on a dedicated
    /// I/O thread, decoupled from any shared event loop.
    #[default]
    Blocking,
    /// The channel is opened with `O_NONBLOCK`; an empty pipe yields
    /// `FillStatus::Pending` so an event-loop host can poll for readiness.
    NonBlocking,
}

#[derive(Clone, Debug)]
pub struct PipeConfig {
    /// Data pipe path. Stored as configuration only: the current producer
    /// handshake uses the signal path for both readiness and frame bytes, and
    /// this path is never opened. Kept separate deliberately; do not fold the
    /// two together without confirming producer-side behavior.
    pub data_path: PathBuf,
    /// Signal/handshake pipe path, opened write-then-read.
    pub signal_path: PathBuf,
    pub read_mode: ReadMode,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("/run/mjpeg/frames"),
            signal_path: PathBuf::from("/run/mjpeg/signal"),
            read_mode: ReadMode::Blocking,
        }
    }
}

/// Channel, staging buffer, and stats live only after the first fill; a
/// source that never filled tears down without ever allocating them.
struct Active {
    channel: File,
    scan: ScanBuffer,
    stats: Throughput,
}

/// Pipe-fed MJPEG video source.
pub struct MjpegPipeSource {
    config: PipeConfig,
    active: Option<Active>,
    /// Sink attached before the lazy setup ran; handed to the stats then.
    pending_sink: Option<Box<dyn TelemetrySink>>,
    streaming: bool,
    frame_rate: u32,
}

impl MjpegPipeSource {
    /// Stores the configuration. Performs no I/O.
    pub fn new(config: PipeConfig) -> Self {
        Self {
            config,
            active: None,
            pending_sink: None,
            streaming: false,
            frame_rate: 0,
        }
    }

    pub fn config(&self) -> &PipeConfig {
        &self.config
    }

    /// Requested frame rate. Stored only; pacing is the producer's job.
    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    fn set_up(&mut self) -> Result<Active> {
        let path = &self.config.signal_path;
        log::info!(
            "MjpegPipeSource: opening signal pipe {} ({:?})",
            path.display(),
            self.config.read_mode
        );

        // Readiness handshake: a short-lived write open, dropped immediately.
        OpenOptions::new()
            .write(true)
            .create(true)
            .open(path)
            .map_err(|source| SourceError::ChannelOpenFailure {
                path: path.clone(),
                source,
            })?;

        let mut opts = OpenOptions::new();
        opts.read(true);
        #[cfg(unix)]
        if self.config.read_mode == ReadMode::NonBlocking {
            use std::os::unix::fs::OpenOptionsExt;
            opts.custom_flags(libc::O_NONBLOCK);
        }
        let channel = opts
            .open(path)
            .map_err(|source| SourceError::ChannelOpenFailure {
                path: path.clone(),
                source,
            })?;

        let mut stats = Throughput::new();
        if let Some(sink) = self.pending_sink.take() {
            stats.set_sink(sink);
        }

        Ok(Active {
            channel,
            scan: ScanBuffer::new(),
            stats,
        })
    }
}

impl VideoSource for MjpegPipeSource {
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
        if self.active.is_none() {
            self.active = Some(self.set_up()?);
        }
        let active = self.active.as_mut().expect("channel state set up above");

        // A previous extraction may have left a complete frame staged.
        if let Some(end) = active.scan.take_pending() {
            let len = active.scan.extract(end, dest)?;
            active.stats.record_frame(len);
            return Ok(FillStatus::Frame(len));
        }

        loop {
            let stage = active.scan.stage_mut()?;
            let n = match active.channel.read(stage) {
                // Producer has not written enough yet; not an error.
                Ok(0) => return Ok(FillStatus::Pending),
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    return Ok(FillStatus::Pending)
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(source) => return Err(SourceError::Read { source }),
            };

            if let Some(end) = active.scan.commit(n) {
                let len = active.scan.extract(end, dest)?;
                active.stats.record_frame(len);
                return Ok(FillStatus::Frame(len));
            }
        }
    }

    fn set_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        match self.active {
            Some(ref mut active) => active.stats.set_sink(sink),
            None => self.pending_sink = Some(sink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn frame_of(len: usize, fill: u8) -> Vec<u8> {
        let mut f = vec![fill; len];
        f[len - 2] = 0xFF;
        f[len - 1] = 0xD9;
        f
    }

    /// Regular files share the open/read semantics the source needs, so tests
    /// use them in place of FIFOs; EOF behaves like an empty pipe.
    fn signal_file(frames: &[Vec<u8>]) -> tempfile::TempPath {
        let mut file = tempfile::NamedTempFile::new().expect("temp signal file");
        for frame in frames {
            file.write_all(frame).expect("write frame");
        }
        file.into_temp_path()
    }

    fn source_for(path: &std::path::Path) -> MjpegPipeSource {
        MjpegPipeSource::new(PipeConfig {
            signal_path: path.to_path_buf(),
            ..PipeConfig::default()
        })
    }

    #[test]
    fn construction_and_drop_without_fill_do_no_io() {
        let source = source_for(std::path::Path::new("/nonexistent/dir/pipe"));
        assert!(!source.is_streaming());
        drop(source);
    }

    #[test]
    fn frames_come_out_in_order_then_pending() {
        let frames = vec![frame_of(5000, 0x21), frame_of(1234, 0x42)];
        let path = signal_file(&frames);
        let mut source = source_for(&path);
        source.stream_on().unwrap();

        let mut dest = vec![0u8; 8192];
        for expected in &frames {
            match source.fill_buffer(&mut dest).unwrap() {
                FillStatus::Frame(len) => assert_eq!(&dest[..len], &expected[..]),
                FillStatus::Pending => panic!("expected a frame"),
            }
        }
        assert_eq!(source.fill_buffer(&mut dest).unwrap(), FillStatus::Pending);
    }

    #[test]
    fn open_failure_is_typed_and_retryable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("signal");
        let mut source = source_for(&path);

        let mut dest = vec![0u8; 1024];
        let err = source.fill_buffer(&mut dest).unwrap_err();
        assert!(matches!(err, SourceError::ChannelOpenFailure { .. }));
        assert!(err.is_retryable());

        // Once the directory exists the same call succeeds.
        std::fs::create_dir(dir.path().join("missing")).unwrap();
        std::fs::write(&path, frame_of(100, 0x10)).unwrap();
        match source.fill_buffer(&mut dest).unwrap() {
            FillStatus::Frame(len) => assert_eq!(len, 100),
            FillStatus::Pending => panic!("expected a frame after retry"),
        }
    }

    #[test]
    fn set_format_rejects_non_mjpg_and_leaves_state() {
        let path = signal_file(&[]);
        let mut source = source_for(&path);
        source.stream_on().unwrap();
        source.set_frame_rate(30).unwrap();

        let err = source.set_format(FourCc::new(*b"YUYV")).unwrap_err();
        assert!(matches!(
            err,
            SourceError::InvalidFormat { fourcc } if fourcc == FourCc::new(*b"YUYV")
        ));
        assert!(source.is_streaming());
        assert_eq!(source.frame_rate(), 30);

        source.set_format(FourCc::MJPG).unwrap();
    }

    #[test]
    fn buffer_capabilities_are_unsupported_or_noop() {
        let path = signal_file(&[]);
        let mut source = source_for(&path);
        assert!(matches!(
            source.alloc_buffers(4),
            Err(SourceError::Unsupported("alloc_buffers"))
        ));
        assert!(matches!(
            source.export_buffers(),
            Err(SourceError::Unsupported("export_buffers"))
        ));
        source.free_buffers().unwrap();
    }

    #[test]
    fn stream_toggle_only_flips_the_flag() {
        let path = signal_file(&[frame_of(64, 0x01)]);
        let mut source = source_for(&path);
        source.stream_on().unwrap();
        source.stream_off().unwrap();
        assert!(!source.is_streaming());

        // The flag does not gate the data path; the capture loop owns that.
        let mut dest = vec![0u8; 256];
        assert!(matches!(
            source.fill_buffer(&mut dest).unwrap(),
            FillStatus::Frame(64)
        ));
    }
}
