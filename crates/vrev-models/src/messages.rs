//! Localized user-facing messages.
//!
//! Raw service errors never reach result items; these fixed strings are
//! shown instead.

/// Per-frame failure inside a batch run.
pub const FRAME_ANALYSIS_FAILED: &str = "分析帧失败";

/// Failure of an ad-hoc capture.
pub const CAPTURE_ANALYSIS_FAILED: &str = "分析失败";

/// Whole-run failure notification (extraction failed).
pub const RUN_FAILED: &str = "视频处理失败，请重试。";

/// Storyboard synthesis failure.
pub const STORYBOARD_FAILED: &str = "分镜脚本生成失败";

/// Non-video upload.
pub const NOT_A_VIDEO: &str = "请上传有效的视频文件。";
