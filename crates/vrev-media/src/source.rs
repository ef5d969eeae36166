//! Seekable frame sources.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::frame::CaptureSize;
use crate::probe::{probe_video, VideoInfo};

/// A decodable video that can be seeked and rasterized.
///
/// Implementations expose a single position cursor, so callers seek one
/// timestamp at a time.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Load metadata (dimensions and duration).
    async fn metadata(&self) -> MediaResult<VideoInfo>;

    /// Seek to `timestamp` and return the frame there as PNG at `size`.
    async fn grab(&self, timestamp: f64, size: CaptureSize) -> MediaResult<Vec<u8>>;
}

/// Frame source backed by the `ffmpeg`/`ffprobe` CLIs.
#[derive(Debug, Clone)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegFrameSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            timeout: None,
        }
    }

    /// Kill ffmpeg if a single capture runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Command that decodes one frame at `timestamp` into PNG on stdout.
    pub fn grab_command(&self, timestamp: f64, size: CaptureSize) -> FfmpegCommand {
        FfmpegCommand::to_stdout(&self.path)
            .seek(timestamp.max(0.0))
            .single_frame()
            .no_audio()
            .video_filter(size.scale_filter())
            .format("image2pipe")
            .video_codec("png")
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn metadata(&self) -> MediaResult<VideoInfo> {
        probe_video(&self.path).await
    }

    async fn grab(&self, timestamp: f64, size: CaptureSize) -> MediaResult<Vec<u8>> {
        let cmd = self.grab_command(timestamp, size);
        let mut runner = FfmpegRunner::new();
        if let Some(timeout) = self.timeout {
            runner = runner.with_timeout(timeout);
        }

        let png = runner.run_capture(&cmd).await?;
        if png.is_empty() {
            // ffmpeg exits cleanly when the seek lands past the last frame
            return Err(MediaError::NoFrame(timestamp));
        }

        debug!(
            path = %self.path.display(),
            timestamp = timestamp,
            bytes = png.len(),
            "Captured frame"
        );
        Ok(png)
    }
}
