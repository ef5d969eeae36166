//! Uploaded video storage.
//!
//! The blob is written to a temp file under the work dir and deleted once
//! the last reference to its [`UploadedVideo`] is dropped, which happens
//! after the video is cleared or replaced and no in-flight run holds it.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tempfile::TempPath;
use tracing::debug;
use vrev_media::{CaptureSize, FfmpegFrameSource, FrameSource, MediaResult, VideoInfo};

use crate::error::ApiResult;

/// A frame source that owns its backing temp file.
pub struct UploadedVideo {
    inner: FfmpegFrameSource,
    file: TempPath,
}

impl UploadedVideo {
    /// Persist `bytes` to a new temp file in `work_dir`.
    pub async fn store(
        work_dir: &Path,
        extension: &str,
        bytes: &[u8],
        seek_timeout: Duration,
    ) -> ApiResult<Self> {
        tokio::fs::create_dir_all(work_dir).await?;
        let file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&format!(".{}", extension))
            .tempfile_in(work_dir)?
            .into_temp_path();
        tokio::fs::write(&file, bytes).await?;
        debug!(path = %file.display(), size = bytes.len(), "Stored upload");

        Ok(Self {
            inner: FfmpegFrameSource::new(&file).with_timeout(seek_timeout),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file
    }
}

#[async_trait]
impl FrameSource for UploadedVideo {
    async fn metadata(&self) -> MediaResult<VideoInfo> {
        self.inner.metadata().await
    }

    async fn grab(&self, timestamp: f64, size: CaptureSize) -> MediaResult<Vec<u8>> {
        self.inner.grab(timestamp, size).await
    }
}
