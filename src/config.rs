//! Configuration for the capture daemon.
//!
//! Loaded from an optional JSON file named by `PIPECAP_CONFIG`, then
//! overridden by environment variables, then validated. The library types
//! take plain config structs; this layering exists for the daemon.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::source::{
    MjpegPipeSource, PipeConfig, ReadMode, TestPatternConfig, TestPatternSource, VideoSource,
};

const DEFAULT_FPS: u32 = 30;

#[derive(Debug, Deserialize, Default)]
struct PipecapConfigFile {
    source: Option<String>,
    fps: Option<u32>,
    pipe: Option<PipeConfigFile>,
    pattern: Option<PatternConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct PipeConfigFile {
    data_path: Option<PathBuf>,
    signal_path: Option<PathBuf>,
    read_mode: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct PatternConfigFile {
    frame_len: Option<usize>,
}

/// Which source kind the daemon constructs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    MjpegPipe,
    TestPattern,
}

#[derive(Clone, Debug)]
pub struct PipecapConfig {
    pub source: SourceKind,
    pub fps: u32,
    pub pipe: PipeConfig,
    pub pattern: TestPatternConfig,
}

impl PipecapConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PIPECAP_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => read_config_file(Path::new(path))?,
            None => PipecapConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: PipecapConfigFile) -> Result<Self> {
        let source = match file.source.as_deref() {
            None => SourceKind::MjpegPipe,
            Some(name) => parse_source_kind(name)?,
        };
        let defaults = PipeConfig::default();
        let pipe = PipeConfig {
            data_path: file
                .pipe
                .as_ref()
                .and_then(|pipe| pipe.data_path.clone())
                .unwrap_or(defaults.data_path),
            signal_path: file
                .pipe
                .as_ref()
                .and_then(|pipe| pipe.signal_path.clone())
                .unwrap_or(defaults.signal_path),
            read_mode: match file.pipe.as_ref().and_then(|pipe| pipe.read_mode.as_deref()) {
                None => defaults.read_mode,
                Some(mode) => parse_read_mode(mode)?,
            },
        };
        let pattern = TestPatternConfig {
            frame_len: file
                .pattern
                .and_then(|pattern| pattern.frame_len)
                .unwrap_or(TestPatternConfig::default().frame_len),
        };
        Ok(Self {
            source,
            fps: file.fps.unwrap_or(DEFAULT_FPS),
            pipe,
            pattern,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(kind) = std::env::var("PIPECAP_SOURCE") {
            if !kind.trim().is_empty() {
                self.source = parse_source_kind(&kind)?;
            }
        }
        if let Ok(path) = std::env::var("PIPECAP_DATA_PIPE") {
            if !path.trim().is_empty() {
                self.pipe.data_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("PIPECAP_SIGNAL_PIPE") {
            if !path.trim().is_empty() {
                self.pipe.signal_path = PathBuf::from(path);
            }
        }
        if let Ok(mode) = std::env::var("PIPECAP_READ_MODE") {
            if !mode.trim().is_empty() {
                self.pipe.read_mode = parse_read_mode(&mode)?;
            }
        }
        if let Ok(fps) = std::env::var("PIPECAP_FPS") {
            let fps: u32 = fps
                .parse()
                .map_err(|_| anyhow!("PIPECAP_FPS must be an integer"))?;
            self.fps = fps;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(anyhow!("fps must be greater than zero"));
        }
        if self.source == SourceKind::MjpegPipe {
            if self.pipe.signal_path.as_os_str().is_empty() {
                return Err(anyhow!("signal pipe path must not be empty"));
            }
            if self.pipe.data_path.as_os_str().is_empty() {
                return Err(anyhow!("data pipe path must not be empty"));
            }
        }
        if self.source == SourceKind::TestPattern && self.pattern.frame_len < 2 {
            return Err(anyhow!("pattern frame_len must fit the frame terminator"));
        }
        Ok(())
    }

    /// Constructs the configured source kind.
    pub fn build_source(&self) -> Box<dyn VideoSource> {
        match self.source {
            SourceKind::MjpegPipe => Box::new(MjpegPipeSource::new(self.pipe.clone())),
            SourceKind::TestPattern => Box::new(TestPatternSource::new(self.pattern.clone())),
        }
    }
}

fn parse_source_kind(name: &str) -> Result<SourceKind> {
    match name {
        "mjpeg-pipe" => Ok(SourceKind::MjpegPipe),
        "test-pattern" => Ok(SourceKind::TestPattern),
        other => Err(anyhow!(
            "unknown source kind '{}'; expected mjpeg-pipe or test-pattern",
            other
        )),
    }
}

fn parse_read_mode(mode: &str) -> Result<ReadMode> {
    match mode {
        "blocking" => Ok(ReadMode::Blocking),
        "nonblocking" => Ok(ReadMode::NonBlocking),
        other => Err(anyhow!(
            "unknown read mode '{}'; expected blocking or nonblocking",
            other
        )),
    }
}

fn read_config_file(path: &Path) -> Result<PipecapConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
