//! Media errors.

use std::fmt;
use std::path::PathBuf;
use std::process::Output;
use thiserror::Error;

pub type MediaResult<T> = Result<T, MediaError>;

/// External program a media operation shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        })
    }
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("{0} not found in PATH")]
    ToolMissing(Tool),

    #[error("{tool} exited with {code:?}: {stderr}")]
    ToolFailed {
        tool: Tool,
        code: Option<i32>,
        stderr: String,
    },

    #[error("video file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("unreadable video: {0}")]
    InvalidVideo(String),

    #[error("no frame decoded at {0:.3}s")]
    NoFrame(f64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MediaError {
    pub fn invalid_video(message: impl Into<String>) -> Self {
        Self::InvalidVideo(message.into())
    }

    /// Failure of `tool`, keeping its trimmed stderr.
    pub fn tool_failed(tool: Tool, output: &Output) -> Self {
        Self::ToolFailed {
            tool,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
    }

    /// The upload itself is unusable, as opposed to a broken toolchain.
    ///
    /// ffprobe only fails on inputs it cannot demux.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidVideo(_)
                | MediaError::ToolFailed {
                    tool: Tool::Ffprobe,
                    ..
                }
        )
    }
}
