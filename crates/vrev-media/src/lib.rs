//! FFmpeg CLI wrapper for frame sampling and capture.
//!
//! This crate provides:
//! - Video probing via ffprobe
//! - Evenly spaced timestamp sampling
//! - A [`FrameSource`] seam over a seekable video, with an ffmpeg backend
//! - Sequential, all-or-nothing frame extraction at half native size

pub mod command;
pub mod error;
pub mod extractor;
pub mod frame;
pub mod probe;
pub mod sampler;
pub mod source;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult, Tool};
pub use extractor::{capture_frame, extract_frames};
pub use frame::{CaptureSize, Frame};
pub use probe::{probe_video, VideoInfo};
pub use sampler::sample_timestamps;
pub use source::{FfmpegFrameSource, FrameSource};
