//! End-to-end tests for the MJPEG pipe source through the public API.
//!
//! Regular files stand in for named pipes: the source only needs open/read
//! semantics from the signal path, and EOF behaves like a pipe with no data.

use std::io::Write;
use std::sync::{Arc, Mutex};

use mjpegpipe::{
    FillStatus, FourCc, MjpegPipeSource, PipeConfig, ReadMode, SourceError, TelemetrySink,
    ThroughputReport, VideoSource, REPORT_INTERVAL_FRAMES,
};

fn frame_of(len: usize, fill: u8) -> Vec<u8> {
    let mut f = vec![fill; len];
    f[len - 2] = 0xFF;
    f[len - 1] = 0xD9;
    f
}

fn signal_file(frames: &[Vec<u8>]) -> tempfile::TempPath {
    let mut file = tempfile::NamedTempFile::new().expect("temp signal file");
    for frame in frames {
        file.write_all(frame).expect("write frame");
    }
    file.into_temp_path()
}

fn pipe_source(path: &std::path::Path, read_mode: ReadMode) -> MjpegPipeSource {
    MjpegPipeSource::new(PipeConfig {
        signal_path: path.to_path_buf(),
        read_mode,
        ..PipeConfig::default()
    })
}

#[derive(Clone, Default)]
struct CaptureSink(Arc<Mutex<Vec<ThroughputReport>>>);

impl TelemetrySink for CaptureSink {
    fn report(&mut self, report: ThroughputReport) {
        self.0.lock().unwrap().push(report);
    }
}

#[test]
fn yields_every_frame_byte_identical_in_order() {
    // Mixed sizes, including frames smaller and larger than the read chunk.
    let frames: Vec<Vec<u8>> = vec![
        frame_of(48, 0x31),
        frame_of(5000, 0x32),
        frame_of(257, 0x33),
        frame_of(256, 0x34),
        frame_of(10_240, 0x35),
    ];
    let path = signal_file(&frames);
    let mut source = pipe_source(&path, ReadMode::Blocking);
    source.set_format(FourCc::MJPG).unwrap();
    source.stream_on().unwrap();

    let mut dest = vec![0u8; 64 * 1024];
    for expected in &frames {
        match source.fill_buffer(&mut dest).unwrap() {
            FillStatus::Frame(len) => assert_eq!(&dest[..len], &expected[..]),
            FillStatus::Pending => panic!("frame expected"),
        }
    }
    assert_eq!(source.fill_buffer(&mut dest).unwrap(), FillStatus::Pending);
}

#[test]
fn nonblocking_mode_reads_frames_and_goes_pending() {
    let frames = vec![frame_of(777, 0x44)];
    let path = signal_file(&frames);
    let mut source = pipe_source(&path, ReadMode::NonBlocking);
    source.stream_on().unwrap();

    let mut dest = vec![0u8; 4096];
    assert!(matches!(
        source.fill_buffer(&mut dest).unwrap(),
        FillStatus::Frame(777)
    ));
    assert_eq!(source.fill_buffer(&mut dest).unwrap(), FillStatus::Pending);
}

#[test]
fn telemetry_reports_once_per_fifty_frames() {
    let count = REPORT_INTERVAL_FRAMES as usize;
    let frames: Vec<Vec<u8>> = (0..count).map(|_| frame_of(100, 0x01)).collect();
    let path = signal_file(&frames);

    let sink = CaptureSink::default();
    let mut source = pipe_source(&path, ReadMode::Blocking);
    source.set_sink(Box::new(sink.clone()));
    source.stream_on().unwrap();

    let mut dest = vec![0u8; 1024];
    for produced in 1..=count {
        assert!(matches!(
            source.fill_buffer(&mut dest).unwrap(),
            FillStatus::Frame(100)
        ));
        let reports = sink.0.lock().unwrap().len();
        if produced < count {
            assert_eq!(reports, 0, "no report expected before frame {count}");
        }
    }

    let reports = sink.0.lock().unwrap().clone();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].frames, REPORT_INTERVAL_FRAMES);
    assert_eq!(reports[0].bytes, REPORT_INTERVAL_FRAMES * 100);
}

#[test]
fn frame_larger_than_destination_is_oversized_then_stream_continues() {
    // The oversized frame ends exactly on a chunk boundary, so none of the
    // following frame is co-staged (and lost) when the scan state resets.
    let frames = vec![frame_of(2048, 0x66), frame_of(100, 0x67)];
    let path = signal_file(&frames);
    let mut source = pipe_source(&path, ReadMode::Blocking);
    source.stream_on().unwrap();

    let mut small = vec![0u8; 512];
    let err = source.fill_buffer(&mut small).unwrap_err();
    assert!(matches!(
        err,
        SourceError::OversizedFrame { needed: 2048, capacity: 512 }
    ));

    // The scan state was reset; the next producer frame comes out intact.
    match source.fill_buffer(&mut small).unwrap() {
        FillStatus::Frame(len) => {
            assert_eq!(len, 100);
            assert_eq!(&small[..len], &frames[1][..]);
        }
        FillStatus::Pending => panic!("frame expected after oversize reset"),
    }
}

#[test]
fn works_through_the_trait_object() {
    let frames = vec![frame_of(300, 0x50)];
    let path = signal_file(&frames);
    let mut source: Box<dyn VideoSource> = Box::new(pipe_source(&path, ReadMode::Blocking));

    assert!(source.set_format(FourCc::new(*b"H264")).is_err());
    source.set_format(FourCc::MJPG).unwrap();
    source.set_frame_rate(30).unwrap();
    source.stream_on().unwrap();
    assert!(source.alloc_buffers(4).is_err());
    source.free_buffers().unwrap();

    let mut dest = vec![0u8; 1024];
    assert!(matches!(
        source.fill_buffer(&mut dest).unwrap(),
        FillStatus::Frame(300)
    ));
    source.stream_off().unwrap();
}
