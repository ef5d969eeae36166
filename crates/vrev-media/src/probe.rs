//! Video metadata via ffprobe.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult, Tool};

/// Intrinsic properties of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Seconds; 0 when the container does not say
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoInfo {
    /// Whether the intrinsic dimensions are known.
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

// Only the first video stream is requested (`-select_streams v:0`).
#[derive(Debug, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

fn seconds(value: Option<&str>) -> Option<f64> {
    value?.trim().parse::<f64>().ok().filter(|d| d.is_finite() && *d >= 0.0)
}

/// Probe `path` for duration and dimensions.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let program = check_ffprobe()?;

    let output = Command::new(program)
        .args(["-v", "error", "-select_streams", "v:0", "-of", "json"])
        .args(["-show_entries", "format=duration:stream=width,height,duration"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::tool_failed(Tool::Ffprobe, &output));
    }

    let info = parse_probe_output(&output.stdout)?;
    debug!(path = %path.display(), duration = info.duration, width = info.width, height = info.height, "Probed video");
    Ok(info)
}

/// Parse ffprobe's JSON report.
///
/// Fails when there is no video stream or it has no dimensions. The
/// container duration wins over the stream duration (webm often only
/// carries the latter).
pub fn parse_probe_output(json: &[u8]) -> MediaResult<VideoInfo> {
    let report: ProbeReport = serde_json::from_slice(json)
        .map_err(|e| MediaError::invalid_video(format!("unparseable ffprobe report: {}", e)))?;
    let stream = report
        .streams
        .first()
        .ok_or_else(|| MediaError::invalid_video("no video stream"))?;

    let duration = seconds(report.format.as_ref().and_then(|f| f.duration.as_deref()))
        .or_else(|| seconds(stream.duration.as_deref()))
        .unwrap_or(0.0);

    let info = VideoInfo {
        duration,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
    };
    if !info.has_dimensions() {
        return Err(MediaError::invalid_video("video stream has no dimensions"));
    }
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [{"width": 1920, "height": 1080}],
            "format": {"duration": "12.480000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!((info.duration - 12.48).abs() < 1e-9);
    }

    #[test]
    fn test_stream_duration_fallback() {
        let json = br#"{"format": {}, "streams": [{"width": 640, "height": 360, "duration": "3.5"}]}"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_duration_is_zero() {
        let json = br#"{"format": {"duration": "N/A"}, "streams": [{"width": 2, "height": 2}]}"#;
        assert_eq!(parse_probe_output(json).unwrap().duration, 0.0);
    }

    #[test]
    fn test_rejects_missing_video_stream() {
        let json = br#"{"format": {"duration": "10"}, "streams": []}"#;
        let err = parse_probe_output(json).unwrap_err();
        assert!(matches!(err, MediaError::InvalidVideo(_)));
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_rejects_missing_dimensions() {
        let json = br#"{"streams": [{"duration": "4"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_garbage_is_invalid_input() {
        let err = parse_probe_output(b"not json").unwrap_err();
        assert!(err.is_invalid_input());
    }
}
