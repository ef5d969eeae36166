//! Batch analysis orchestrator.
//!
//! A batch run goes: sample -> placeholders -> extract -> backfill thumbnails
//! -> analyze each frame in order -> `Complete` -> storyboard. Admission and
//! placeholders happen atomically in [`AnalysisSession::begin_run`]; the rest
//! runs on a spawned task.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::Instrument;
use vrev_ai::{FrameAnalyzer, StoryboardSynthesizer};
use vrev_media::extract_frames;
use vrev_models::messages;

use crate::config::PipelineConfig;
use crate::logging::RunLogger;
use crate::metrics;
use crate::queue::AnalysisQueue;
use crate::reducer::CollectionUpdate;
use crate::session::{AnalysisSession, BatchRun};
use crate::storyboard::synthesize_storyboard;

/// Drives batch runs and ad-hoc captures against one session.
#[derive(Clone)]
pub struct Pipeline {
    pub(crate) session: AnalysisSession,
    pub(crate) queue: AnalysisQueue,
    synthesizer: Arc<dyn StoryboardSynthesizer>,
    pub(crate) seek_timeout: Duration,
}

impl Pipeline {
    /// Build the pipeline and start its analysis worker.
    pub fn new(
        config: &PipelineConfig,
        session: AnalysisSession,
        analyzer: Arc<dyn FrameAnalyzer>,
        synthesizer: Arc<dyn StoryboardSynthesizer>,
    ) -> (Self, JoinHandle<()>) {
        let (queue, worker) =
            AnalysisQueue::spawn(analyzer, config.analysis_timeout, config.queue_capacity);
        let pipeline = Self {
            session,
            queue,
            synthesizer,
            seek_timeout: config.seek_timeout,
        };
        (pipeline, worker)
    }

    pub fn session(&self) -> &AnalysisSession {
        &self.session
    }

    /// Start a batch run. `None` when the run was not admitted (no video,
    /// unknown duration, or already analyzing).
    pub async fn start_batch(&self) -> Option<JoinHandle<()>> {
        let run = self.session.begin_run().await?;
        let logger = RunLogger::new(run.ticket.run_id(), "batch", run.generation.value());
        let span = logger.create_span();
        let pipeline = self.clone();
        Some(tokio::spawn(
            async move { pipeline.run_batch(run, logger).await }.instrument(span),
        ))
    }

    async fn run_batch(self, run: BatchRun, logger: RunLogger) {
        let BatchRun {
            ticket,
            generation,
            source,
            timestamps,
            item_ids,
        } = run;

        logger.log_start(&format!("{} frames", timestamps.len()));
        metrics::record_run_started();
        let started = Instant::now();

        let frames = match extract_frames(source.as_ref(), &timestamps, self.seek_timeout).await {
            Ok(frames) => frames,
            Err(e) => {
                logger.log_error(&format!("Frame extraction failed: {}", e));
                metrics::record_run_aborted();
                self.session.abort_run(ticket, messages::RUN_FAILED).await;
                return;
            }
        };

        let thumbnails = frames
            .iter()
            .map(|f| (f.timestamp, f.image.clone()))
            .collect();
        self.session
            .update(generation, CollectionUpdate::BackfillThumbnails(thumbnails))
            .await;

        let mut shots = Vec::new();
        for (frame, id) in frames.into_iter().zip(item_ids) {
            if !self.session.is_current(generation).await {
                logger.log_warning("Collection replaced, stopping");
                return;
            }

            let timestamp = frame.timestamp;
            match self.queue.analyze(frame.image).await {
                Ok(record) => {
                    metrics::record_frame_analyzed("batch", true);
                    shots.push(record.to_shot(timestamp));
                    self.session
                        .update(generation, CollectionUpdate::MarkReady { id, record })
                        .await;
                }
                Err(e) => {
                    metrics::record_frame_analyzed("batch", false);
                    logger.log_warning(&format!("Frame at {:.3}s failed: {}", timestamp, e));
                    self.session
                        .update(
                            generation,
                            CollectionUpdate::MarkFailed {
                                id,
                                message: messages::FRAME_ANALYSIS_FAILED.to_string(),
                            },
                        )
                        .await;
                }
            }
        }

        if !self.session.finish_run(ticket).await {
            logger.log_warning("Run superseded before completion");
            return;
        }
        metrics::record_run_completed(started.elapsed().as_secs_f64());
        logger.log_completion(&format!(
            "{} of {} frames analyzed",
            shots.len(),
            timestamps.len()
        ));

        synthesize_storyboard(
            &self.session,
            self.synthesizer.as_ref(),
            generation,
            shots,
            &logger,
        )
        .await;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use vrev_ai::{AiError, AiResult};
    use vrev_media::{CaptureSize, FrameSource, MediaError, MediaResult, VideoInfo};
    use vrev_models::{
        AnalysisRecord, ItemStatus, PipelineState, StoryboardShot, VideoDescriptor, VideoId,
    };

    use crate::session::ActiveVideo;

    /// Frame source whose PNG is the timestamp as a single byte.
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub duration: f64,
        pub fail_grab: bool,
        pub grab_delay: Duration,
    }

    #[async_trait]
    impl FrameSource for FakeSource {
        async fn metadata(&self) -> MediaResult<VideoInfo> {
            Ok(VideoInfo {
                duration: self.duration,
                width: 640,
                height: 360,
            })
        }

        async fn grab(&self, timestamp: f64, _size: CaptureSize) -> MediaResult<Vec<u8>> {
            if !self.grab_delay.is_zero() {
                tokio::time::sleep(self.grab_delay).await;
            }
            if self.fail_grab {
                return Err(MediaError::NoFrame(timestamp));
            }
            Ok(vec![timestamp as u8])
        }
    }

    /// Analyzer failing for the listed frame bytes.
    pub(crate) struct FakeAnalyzer {
        pub fail_on: Vec<u8>,
        pub calls: AtomicUsize,
    }

    impl FakeAnalyzer {
        pub fn failing_on(fail_on: Vec<u8>) -> Self {
            Self {
                fail_on,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FrameAnalyzer for FakeAnalyzer {
        async fn analyze_frame(&self, png: &[u8]) -> AiResult<AnalysisRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(&png[0]) {
                return Err(AiError::EmptyResponse);
            }
            Ok(AnalysisRecord {
                visual_description: format!("镜头{}", png[0]),
                ai_prompt: "cinematic".to_string(),
                character_prompt: None,
                technical_breakdown: format!("机位{}", png[0]),
                color_palette: vec!["#111111".into(), "#222222".into(), "#333333".into()],
            })
        }
    }

    /// Answers "storyboard #<call>: <n> shots"; call `i` first sleeps
    /// `delays[i]` when given.
    #[derive(Default)]
    pub(crate) struct FakeSynthesizer {
        pub fail: bool,
        pub delays: Vec<Duration>,
        pub received: Mutex<Vec<Vec<StoryboardShot>>>,
    }

    #[async_trait]
    impl StoryboardSynthesizer for FakeSynthesizer {
        async fn synthesize(&self, shots: &[StoryboardShot]) -> AiResult<String> {
            let call = {
                let mut received = self.received.lock().unwrap();
                received.push(shots.to_vec());
                received.len()
            };
            if let Some(delay) = self.delays.get(call - 1) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail {
                return Err(AiError::Timeout);
            }
            Ok(format!("storyboard #{}: {} shots", call, shots.len()))
        }
    }

    pub(crate) fn active_video(source: FakeSource) -> ActiveVideo {
        ActiveVideo {
            descriptor: VideoDescriptor {
                video_id: VideoId::new(),
                file_name: "clip.mp4".to_string(),
                duration: source.duration,
                width: 640,
                height: 360,
            },
            source: Arc::new(source),
        }
    }

    pub(crate) fn pipeline_with(
        frame_count: u32,
        analyzer: Arc<FakeAnalyzer>,
        synthesizer: Arc<FakeSynthesizer>,
    ) -> Pipeline {
        let config = PipelineConfig {
            default_frame_count: frame_count,
            allowed_frame_counts: vec![frame_count],
            ..Default::default()
        };
        let session = AnalysisSession::new(&config);
        let (pipeline, _worker) = Pipeline::new(&config, session, analyzer, synthesizer);
        pipeline
    }

    fn source(duration: f64) -> FakeSource {
        FakeSource {
            duration,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_no_video_is_noop() {
        let pipeline = pipeline_with(
            8,
            Arc::new(FakeAnalyzer::failing_on(vec![])),
            Arc::new(FakeSynthesizer::default()),
        );
        assert!(pipeline.start_batch().await.is_none());
    }

    #[tokio::test]
    async fn test_one_failure_isolated_and_storyboard_in_order() {
        let analyzer = Arc::new(FakeAnalyzer::failing_on(vec![3]));
        let synthesizer = Arc::new(FakeSynthesizer::default());
        let pipeline = pipeline_with(3, analyzer.clone(), synthesizer.clone());
        // 3 frames over 9s: t = 0, 3, 6; the second one fails
        pipeline.session().load_video(active_video(source(9.0))).await;

        pipeline.start_batch().await.unwrap().await.unwrap();

        let snapshot = pipeline.session().snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Complete);
        let statuses: Vec<ItemStatus> = snapshot.items.iter().map(|i| i.status).collect();
        assert_eq!(
            statuses,
            vec![ItemStatus::Ready, ItemStatus::Failed, ItemStatus::Ready]
        );
        assert_eq!(
            snapshot.items[1].error.as_deref(),
            Some(messages::FRAME_ANALYSIS_FAILED)
        );
        assert!(snapshot.items.iter().all(|i| i.has_thumbnail()));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 3);

        let received = synthesizer.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let times: Vec<f64> = received[0].iter().map(|s| s.timestamp).collect();
        assert_eq!(times, vec![0.0, 6.0]);
        assert_eq!(received[0][1].visual_description, "镜头6");
        assert_eq!(snapshot.storyboard.as_deref(), Some("storyboard #1: 2 shots"));
        assert!(!snapshot.storyboard_pending);
    }

    #[tokio::test]
    async fn test_zero_ready_skips_storyboard() {
        let analyzer = Arc::new(FakeAnalyzer::failing_on((0..=255).collect()));
        let synthesizer = Arc::new(FakeSynthesizer::default());
        let pipeline = pipeline_with(8, analyzer, synthesizer.clone());
        pipeline
            .session()
            .load_video(active_video(source(8.0)))
            .await;

        pipeline.start_batch().await.unwrap().await.unwrap();

        let snapshot = pipeline.session().snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Complete);
        assert!(snapshot.items.iter().all(|i| i.status == ItemStatus::Failed));
        assert!(synthesizer.received.lock().unwrap().is_empty());
        assert!(snapshot.storyboard.is_none());
    }

    #[tokio::test]
    async fn test_storyboard_failure_only_logged() {
        let analyzer = Arc::new(FakeAnalyzer::failing_on(vec![]));
        let synthesizer = Arc::new(FakeSynthesizer {
            fail: true,
            ..Default::default()
        });
        let pipeline = pipeline_with(8, analyzer, synthesizer);
        pipeline
            .session()
            .load_video(active_video(source(8.0)))
            .await;

        pipeline.start_batch().await.unwrap().await.unwrap();

        let snapshot = pipeline.session().snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Complete);
        assert!(snapshot.items.iter().all(|i| i.status == ItemStatus::Ready));
        assert!(snapshot.storyboard.is_none());
        assert!(!snapshot.storyboard_pending);
        assert!(snapshot.notification.is_none());
    }

    #[tokio::test]
    async fn test_extraction_failure_rolls_back() {
        let analyzer = Arc::new(FakeAnalyzer::failing_on(vec![]));
        let synthesizer = Arc::new(FakeSynthesizer::default());
        let pipeline = pipeline_with(8, analyzer.clone(), synthesizer.clone());
        pipeline
            .session()
            .load_video(active_video(FakeSource {
                duration: 8.0,
                fail_grab: true,
                ..Default::default()
            }))
            .await;

        pipeline.start_batch().await.unwrap().await.unwrap();

        let snapshot = pipeline.session().snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert_eq!(snapshot.notification.as_deref(), Some(messages::RUN_FAILED));
        assert!(snapshot.items.iter().all(|i| i.status == ItemStatus::Loading));
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 0);
        assert!(synthesizer.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rerun_yields_same_item_count() {
        let analyzer = Arc::new(FakeAnalyzer::failing_on(vec![]));
        let synthesizer = Arc::new(FakeSynthesizer::default());
        let pipeline = pipeline_with(8, analyzer, synthesizer);
        pipeline
            .session()
            .load_video(active_video(source(30.0)))
            .await;

        pipeline.start_batch().await.unwrap().await.unwrap();
        let first = pipeline.session().snapshot().await;
        pipeline.start_batch().await.unwrap().await.unwrap();
        let second = pipeline.session().snapshot().await;

        assert_eq!(first.items.len(), second.items.len());
        assert_ne!(first.items[0].id, second.items[0].id);
    }

    #[tokio::test]
    async fn test_second_start_while_analyzing_is_noop() {
        let analyzer = Arc::new(FakeAnalyzer::failing_on(vec![]));
        let synthesizer = Arc::new(FakeSynthesizer::default());
        let pipeline = pipeline_with(8, analyzer.clone(), synthesizer);
        pipeline
            .session()
            .load_video(active_video(source(8.0)))
            .await;

        let handle = pipeline.start_batch().await.unwrap();
        assert!(pipeline.start_batch().await.is_none());
        handle.await.unwrap();
        assert_eq!(analyzer.calls.load(Ordering::SeqCst), 8);
    }

    #[tokio::test]
    async fn test_new_video_discards_late_completions() {
        let analyzer = Arc::new(FakeAnalyzer::failing_on(vec![]));
        let synthesizer = Arc::new(FakeSynthesizer::default());
        let pipeline = pipeline_with(8, analyzer, synthesizer.clone());
        let session = pipeline.session().clone();
        session
            .load_video(active_video(source(8.0)))
            .await;

        let handle = pipeline.start_batch().await.unwrap();
        session
            .load_video(active_video(source(4.0)))
            .await;
        handle.await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert!(snapshot.items.is_empty());
        assert!(snapshot.storyboard.is_none());
    }

    #[tokio::test]
    async fn test_late_storyboard_from_previous_run_is_discarded() {
        // run 1 synthesizes in 100ms, run 2 in 300ms
        let synthesizer = Arc::new(FakeSynthesizer {
            delays: vec![Duration::from_millis(100), Duration::from_millis(300)],
            ..Default::default()
        });
        let pipeline = pipeline_with(
            8,
            Arc::new(FakeAnalyzer::failing_on(vec![])),
            synthesizer.clone(),
        );
        let session = pipeline.session().clone();
        session.load_video(active_video(source(8.0))).await;

        let first = pipeline.start_batch().await.unwrap();
        while synthesizer.received.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(session.state().await, PipelineState::Complete);

        let second = pipeline.start_batch().await.unwrap();
        first.await.unwrap();
        // run 1 answered while run 2 is still synthesizing
        assert!(session.snapshot().await.storyboard.is_none());

        second.await.unwrap();
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.storyboard.as_deref(), Some("storyboard #2: 8 shots"));
        assert!(!snapshot.storyboard_pending);
        assert_eq!(synthesizer.received.lock().unwrap().len(), 2);
    }
}
