//! pipecapd - standalone capture loop for the MJPEG pipe source.
//!
//! Drives a configured video source exactly the way a gadget capture pipeline
//! would: one `fill_buffer` call per frame, from a single dedicated thread.
//! Useful for soaking a producer before wiring the source into the gadget,
//! and for watching throughput reports.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use mjpegpipe::{FillStatus, FourCc, PipecapConfig, SCAN_CAPACITY};

#[derive(Parser, Debug)]
#[command(name = "pipecapd", about = "MJPEG pipe capture loop")]
struct Args {
    /// JSON config file (also read from PIPECAP_CONFIG).
    #[arg(long, env = "PIPECAP_CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many frames; 0 runs until interrupted.
    #[arg(long, default_value_t = 0)]
    frames: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Some(path) = &args.config {
        std::env::set_var("PIPECAP_CONFIG", path);
    }
    let cfg = PipecapConfig::load().context("load pipecapd config")?;

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("install signal handler")?;

    let mut source = cfg.build_source();
    source
        .set_format(FourCc::MJPG)
        .context("negotiate format")?;
    source
        .set_frame_rate(cfg.fps)
        .context("set frame rate")?;
    source.stream_on().context("stream on")?;

    log::info!("pipecapd running, source {:?}, {} fps requested", cfg.source, cfg.fps);

    let mut dest = vec![0u8; SCAN_CAPACITY];
    let mut produced = 0u64;

    while running.load(Ordering::SeqCst) {
        match source.fill_buffer(&mut dest) {
            Ok(FillStatus::Frame(len)) => {
                produced += 1;
                log::debug!("frame {} ({} bytes)", produced, len);
                if args.frames != 0 && produced >= args.frames {
                    break;
                }
            }
            Ok(FillStatus::Pending) => {
                // Producer has nothing for us yet; back off briefly.
                std::thread::sleep(Duration::from_millis(2));
            }
            Err(err) if err.is_retryable() => {
                log::warn!("capture stalled ({err}); retrying");
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(err) => return Err(anyhow::Error::new(err).context("capture loop failed")),
        }
    }

    source.stream_off().context("stream off")?;
    log::info!("pipecapd stopped after {} frames", produced);
    Ok(())
}
