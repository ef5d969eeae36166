//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Frame counts the user may choose from.
pub const ALLOWED_FRAME_COUNTS: [u32; 5] = [8, 12, 16, 20, 24];

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Frame count used until the user picks another
    pub default_frame_count: u32,
    /// Selectable frame counts
    pub allowed_frame_counts: Vec<u32>,
    /// Timeout for one remote analysis call
    pub analysis_timeout: Duration,
    /// Timeout for one decoder seek + capture
    pub seek_timeout: Duration,
    /// Directory for uploaded videos (process lifetime only)
    pub work_dir: PathBuf,
    /// Pending analysis jobs before senders wait
    pub queue_capacity: usize,
    /// Buffered session events per subscriber
    pub event_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_frame_count: 8,
            allowed_frame_counts: ALLOWED_FRAME_COUNTS.to_vec(),
            analysis_timeout: Duration::from_secs(120),
            seek_timeout: Duration::from_secs(30),
            work_dir: std::env::temp_dir().join("vrev"),
            queue_capacity: 32,
            event_capacity: 256,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let allowed = defaults.allowed_frame_counts.clone();

        let default_frame_count = std::env::var("VREV_DEFAULT_FRAME_COUNT")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|n| allowed.contains(n))
            .unwrap_or(defaults.default_frame_count);

        Self {
            default_frame_count,
            allowed_frame_counts: allowed,
            analysis_timeout: Duration::from_secs(
                std::env::var("VREV_ANALYSIS_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            seek_timeout: Duration::from_secs(
                std::env::var("VREV_SEEK_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("VREV_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            queue_capacity: std::env::var("VREV_QUEUE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.queue_capacity),
            event_capacity: defaults.event_capacity,
        }
    }

    pub fn is_allowed_frame_count(&self, count: u32) -> bool {
        self.allowed_frame_counts.contains(&count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.default_frame_count, 8);
        assert!(config.is_allowed_frame_count(24));
        assert!(!config.is_allowed_frame_count(10));
        assert_eq!(config.seek_timeout, Duration::from_secs(30));
    }
}
