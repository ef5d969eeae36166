//! Sequential frame extraction.
//!
//! A [`FrameSource`] has one seek cursor, so timestamps are visited strictly
//! one after another. Any failure aborts the whole extraction and no partial
//! result is returned.

use std::time::Duration;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::frame::{CaptureSize, Frame};
use crate::source::FrameSource;

/// Capture one frame per timestamp, in input order, at half native size.
///
/// Each seek is bounded by `seek_timeout`; an elapsed seek fails the
/// extraction with [`MediaError::Timeout`].
pub async fn extract_frames(
    source: &dyn FrameSource,
    timestamps: &[f64],
    seek_timeout: Duration,
) -> MediaResult<Vec<Frame>> {
    let info = source.metadata().await?;
    if !info.has_dimensions() {
        return Err(MediaError::invalid_video("Video has no dimensions"));
    }

    let size = CaptureSize::half_of(&info);
    let mut frames = Vec::with_capacity(timestamps.len());

    for &timestamp in timestamps {
        let image = grab_with_timeout(source, timestamp, size, seek_timeout).await?;
        debug!(timestamp = timestamp, bytes = image.len(), "Extracted frame");
        frames.push(Frame { timestamp, image });
    }

    info!(
        count = frames.len(),
        width = size.width,
        height = size.height,
        "Frame extraction finished"
    );
    Ok(frames)
}

/// Capture the frame at a single position, at half native size.
pub async fn capture_frame(
    source: &dyn FrameSource,
    timestamp: f64,
    seek_timeout: Duration,
) -> MediaResult<Frame> {
    let info = source.metadata().await?;
    let size = CaptureSize::half_of(&info);
    let image = grab_with_timeout(source, timestamp, size, seek_timeout).await?;
    Ok(Frame { timestamp, image })
}

async fn grab_with_timeout(
    source: &dyn FrameSource,
    timestamp: f64,
    size: CaptureSize,
    seek_timeout: Duration,
) -> MediaResult<Vec<u8>> {
    tokio::time::timeout(seek_timeout, source.grab(timestamp, size))
        .await
        .map_err(|_| MediaError::Timeout(seek_timeout.as_secs()))?
}
