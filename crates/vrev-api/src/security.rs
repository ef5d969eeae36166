//! Upload validation.
//!
//! A blob is accepted when its `Content-Type` is `video/*`, or when it is
//! sent as `application/octet-stream` with a video file extension in
//! `X-File-Name`. Everything else is rejected before touching the pipeline.

use axum::http::{header, HeaderMap};

use crate::error::{ApiError, ApiResult};

/// Header carrying the original file name.
pub const FILE_NAME_HEADER: &str = "x-file-name";

/// Maximum length of a stored file name.
pub const MAX_FILE_NAME_LENGTH: usize = 255;

/// Extensions accepted for `application/octet-stream` uploads.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "m4v", "mov", "webm", "mkv", "avi", "mpeg", "mpg", "ogv", "3gp", "flv", "wmv", "ts",
];

/// A validated upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMeta {
    /// Sanitized display name
    pub file_name: String,
    /// Extension used for the stored file
    pub extension: String,
}

/// Validate upload headers.
pub fn validate_upload(headers: &HeaderMap) -> ApiResult<UploadMeta> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    let file_name = headers
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(sanitize_file_name)
        .filter(|n| !n.is_empty());

    let name_extension = file_name.as_deref().and_then(video_extension);

    let extension = if let Some(subtype) = content_type.strip_prefix("video/") {
        if subtype.is_empty() {
            return Err(ApiError::not_a_video());
        }
        name_extension.unwrap_or_else(|| extension_for_subtype(subtype).to_string())
    } else if content_type == "application/octet-stream" {
        name_extension.ok_or_else(ApiError::not_a_video)?
    } else {
        return Err(ApiError::not_a_video());
    };

    Ok(UploadMeta {
        file_name: file_name.unwrap_or_else(|| format!("video.{}", extension)),
        extension,
    })
}

/// Lower-cased extension if it names a known video container.
pub fn video_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    VIDEO_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn extension_for_subtype(subtype: &str) -> &str {
    match subtype {
        "quicktime" => "mov",
        "x-matroska" => "mkv",
        "x-msvideo" => "avi",
        "ogg" => "ogv",
        "mp2t" => "ts",
        "webm" => "webm",
        "mpeg" => "mpeg",
        _ => "mp4",
    }
}

/// Keep the last path component, drop control characters, cap the length.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    base.chars()
        .filter(|c| !c.is_control())
        .take(MAX_FILE_NAME_LENGTH)
        .collect::<String>()
        .trim()
        .to_string()
}
