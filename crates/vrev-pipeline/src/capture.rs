//! Ad-hoc capture of the frame at the playback position.

use tokio::task::JoinHandle;
use tracing::Instrument;
use vrev_media::capture_frame;
use vrev_models::{messages, ResultItem};

use crate::logging::RunLogger;
use crate::metrics;
use crate::orchestrator::Pipeline;
use crate::reducer::CollectionUpdate;
use crate::session::CaptureTarget;

impl Pipeline {
    /// Capture and analyze the frame at `position`.
    ///
    /// `None` (a no-op) without a video, at position zero, or while a batch
    /// run is analyzing. The analysis shares the batch queue.
    pub async fn capture(&self, position: f64) -> Option<JoinHandle<()>> {
        let target = self.session.capture_target(position).await?;
        let logger = RunLogger::new(
            &uuid::Uuid::new_v4().to_string(),
            "capture",
            target.generation.value(),
        );
        let span = logger.create_span();
        let pipeline = self.clone();
        Some(tokio::spawn(
            async move { pipeline.run_capture(target, logger).await }.instrument(span),
        ))
    }

    async fn run_capture(self, target: CaptureTarget, logger: RunLogger) {
        let CaptureTarget {
            generation,
            source,
            position,
        } = target;
        logger.log_start(&format!("position {:.3}s", position));

        let frame = match capture_frame(source.as_ref(), position, self.seek_timeout).await {
            Ok(frame) => frame,
            Err(e) => {
                metrics::record_capture(false);
                logger.log_warning(&format!("Capture failed: {}", e));
                return;
            }
        };
        metrics::record_capture(true);

        let item = ResultItem::captured(frame.timestamp, frame.image.clone());
        let id = item.id.clone();
        if !self
            .session
            .update(generation, CollectionUpdate::Prepend(item))
            .await
        {
            return;
        }

        let update = match self.queue.analyze(frame.image).await {
            Ok(record) => {
                metrics::record_frame_analyzed("capture", true);
                logger.log_completion("Frame analyzed");
                CollectionUpdate::MarkReady { id, record }
            }
            Err(e) => {
                metrics::record_frame_analyzed("capture", false);
                logger.log_warning(&format!("Analysis failed: {}", e));
                CollectionUpdate::MarkFailed {
                    id,
                    message: messages::CAPTURE_ANALYSIS_FAILED.to_string(),
                }
            }
        };
        self.session.update(generation, update).await;
    }
}
