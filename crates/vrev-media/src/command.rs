//! FFmpeg invocation.
//!
//! Frames are never written to disk: the capture command encodes a single
//! PNG to stdout and [`FfmpegRunner::run_capture`] collects those bytes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult, Tool};

/// Output target that writes the encoded stream to stdout.
pub const STDOUT_PIPE: &str = "pipe:1";

/// Arguments for one ffmpeg process.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    before_input: Vec<String>,
    after_input: Vec<String>,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            before_input: Vec::new(),
            after_input: Vec::new(),
        }
    }

    /// Encoded output goes to stdout.
    pub fn to_stdout(input: impl AsRef<Path>) -> Self {
        Self::new(input, STDOUT_PIPE)
    }

    /// Argument placed before `-i`.
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.before_input.push(arg.into());
        self
    }

    fn output_pair(mut self, flag: &str, value: impl Into<String>) -> Self {
        self.after_input.push(flag.to_string());
        self.after_input.push(value.into());
        self
    }

    /// Input-side seek, so the demuxer jumps instead of decoding from zero.
    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{:.3}", seconds))
    }

    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_pair("-vf", filter)
    }

    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_pair("-c:v", codec)
    }

    pub fn format(self, format: impl Into<String>) -> Self {
        self.output_pair("-f", format)
    }

    pub fn single_frame(self) -> Self {
        self.output_pair("-frames:v", "1")
    }

    pub fn no_audio(mut self) -> Self {
        self.after_input.push("-an".to_string());
        self
    }

    /// Full argument list, without the program name.
    pub fn build_args(&self) -> Vec<String> {
        let head = ["-y", "-nostdin", "-v", "error"].map(String::from);
        head.into_iter()
            .chain(self.before_input.iter().cloned())
            .chain([
                "-i".to_string(),
                self.input.to_string_lossy().into_owned(),
            ])
            .chain(self.after_input.iter().cloned())
            .chain(std::iter::once(self.output.to_string_lossy().into_owned()))
            .collect()
    }
}

/// Runs [`FfmpegCommand`]s, optionally bounded by a timeout.
#[derive(Debug, Default, Clone)]
pub struct FfmpegRunner {
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run `cmd` and return what it wrote to stdout.
    ///
    /// The child is killed if the timeout elapses or the future is dropped.
    pub async fn run_capture(&self, cmd: &FfmpegCommand) -> MediaResult<Vec<u8>> {
        let program = check_ffmpeg()?;
        let args = cmd.build_args();
        debug!(args = %args.join(" "), "Spawning ffmpeg");

        let started = Instant::now();
        let child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let waited = child.wait_with_output();
        let output = if let Some(limit) = self.timeout {
            tokio::time::timeout(limit, waited).await.map_err(|_| {
                warn!(timeout_secs = limit.as_secs(), "ffmpeg timed out; killing");
                MediaError::Timeout(limit.as_secs())
            })??
        } else {
            waited.await?
        };
        metrics::histogram!("vrev_ffmpeg_duration_seconds").record(started.elapsed().as_secs_f64());

        if !output.status.success() {
            return Err(MediaError::tool_failed(Tool::Ffmpeg, &output));
        }
        Ok(output.stdout)
    }
}

/// Locate `ffmpeg` on PATH.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::ToolMissing(Tool::Ffmpeg))
}

/// Locate `ffprobe` on PATH.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::ToolMissing(Tool::Ffprobe))
}
