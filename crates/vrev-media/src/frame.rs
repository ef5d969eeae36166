//! Captured frames and capture geometry.

use crate::probe::VideoInfo;

/// One captured still: timestamp plus PNG bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Requested time in seconds
    pub timestamp: f64,
    /// PNG-encoded image
    pub image: Vec<u8>,
}

/// Pixel size of the capture surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureSize {
    pub width: u32,
    pub height: u32,
}

impl CaptureSize {
    /// Half the native resolution, never below one pixel.
    pub fn half_of(info: &VideoInfo) -> Self {
        Self {
            width: (info.width / 2).max(1),
            height: (info.height / 2).max(1),
        }
    }

    /// FFmpeg scale filter for this size.
    pub fn scale_filter(&self) -> String {
        format!("scale={}:{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: u32, height: u32) -> VideoInfo {
        VideoInfo {
            duration: 1.0,
            width,
            height,
        }
    }

    #[test]
    fn test_half_size() {
        let size = CaptureSize::half_of(&info(1920, 1080));
        assert_eq!(size, CaptureSize { width: 960, height: 540 });
        assert_eq!(size.scale_filter(), "scale=960:540");
    }

    #[test]
    fn test_half_size_rounds_down_and_clamps() {
        assert_eq!(
            CaptureSize::half_of(&info(641, 1)),
            CaptureSize { width: 320, height: 1 }
        );
    }
}
