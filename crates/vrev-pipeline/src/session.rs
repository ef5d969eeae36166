//! Analysis session: the single mutable home of pipeline state.
//!
//! All state lives behind one lock. Every mutation goes through the reducer
//! or the run state machine and is announced on a broadcast channel while
//! the lock is still held, so subscribers see events in mutation order.

use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};
use vrev_media::{sample_timestamps, FrameSource};
use vrev_models::{
    PipelineState, ResultId, ResultItem, SessionEvent, SessionSnapshot, VideoDescriptor,
};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::metrics;
use crate::reducer::{reduce, Change, CollectionUpdate, Generation, Reduction, Tagged};
use crate::state_machine::{RunStateMachine, RunTicket};

/// A loaded video and the source frames are read from.
#[derive(Clone)]
pub struct ActiveVideo {
    pub descriptor: VideoDescriptor,
    pub source: Arc<dyn FrameSource>,
}

/// Everything a batch run needs once it has been admitted.
pub struct BatchRun {
    pub ticket: RunTicket,
    pub generation: Generation,
    pub source: Arc<dyn FrameSource>,
    pub timestamps: Vec<f64>,
    /// Placeholder ids, parallel to `timestamps`
    pub item_ids: Vec<ResultId>,
}

/// Everything an ad-hoc capture needs once it has been admitted.
pub struct CaptureTarget {
    pub generation: Generation,
    pub source: Arc<dyn FrameSource>,
    pub position: f64,
}

struct SessionInner {
    video: Option<ActiveVideo>,
    machine: RunStateMachine,
    generation: Generation,
    items: Vec<ResultItem>,
    storyboard: Option<String>,
    storyboard_pending: bool,
    notification: Option<String>,
    frame_count: u32,
}

impl SessionInner {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            video: self.video.as_ref().map(|v| v.descriptor.clone()),
            state: self.machine.state(),
            frame_count: self.frame_count,
            items: self.items.clone(),
            storyboard: self.storyboard.clone(),
            storyboard_pending: self.storyboard_pending,
            notification: self.notification.clone(),
        }
    }

    /// Drop run state tied to the previous video. The collection itself is
    /// replaced through the reducer by the caller.
    fn reset(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.machine.reset();
        self.storyboard = None;
        self.storyboard_pending = false;
        self.notification = None;
        self.generation
    }
}

/// Shared session handle.
#[derive(Clone)]
pub struct AnalysisSession {
    inner: Arc<Mutex<SessionInner>>,
    events: broadcast::Sender<SessionEvent>,
    allowed_frame_counts: Arc<Vec<u32>>,
}

impl AnalysisSession {
    pub fn new(config: &PipelineConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let inner = SessionInner {
            video: None,
            machine: RunStateMachine::new(),
            generation: Generation::default(),
            items: Vec::new(),
            storyboard: None,
            storyboard_pending: false,
            notification: None,
            frame_count: config.default_frame_count,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            events,
            allowed_frame_counts: Arc::new(config.allowed_frame_counts.clone()),
        }
    }

    /// Callers hold the session lock.
    fn emit(&self, event: SessionEvent) {
        debug!(event = event.kind(), "Session event");
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Subscribe and take a snapshot atomically. Events are sent under the
    /// same lock, so the receiver starts exactly after the snapshot.
    pub async fn subscribe(&self) -> (SessionSnapshot, broadcast::Receiver<SessionEvent>) {
        let inner = self.inner.lock().await;
        let rx = self.events.subscribe();
        (inner.snapshot(), rx)
    }

    pub async fn generation(&self) -> Generation {
        self.inner.lock().await.generation
    }

    pub async fn is_current(&self, generation: Generation) -> bool {
        self.inner.lock().await.generation == generation
    }

    pub async fn state(&self) -> PipelineState {
        self.inner.lock().await.machine.state()
    }

    pub async fn active_video(&self) -> Option<ActiveVideo> {
        self.inner.lock().await.video.clone()
    }

    /// Make `video` the active video. Everything from the previous one is
    /// discarded and in-flight work for it becomes stale.
    pub async fn load_video(&self, video: ActiveVideo) -> Generation {
        let mut inner = self.inner.lock().await;
        let generation = inner.reset();
        let descriptor = video.descriptor.clone();
        inner.video = Some(video);

        info!(
            video_id = %descriptor.video_id,
            generation = generation.value(),
            duration = descriptor.duration,
            "Video loaded"
        );
        self.emit(SessionEvent::VideoLoaded { video: descriptor });
        self.announce_reset(&mut inner, generation);
        generation
    }

    /// Remove the active video. Returns false when there was none.
    pub async fn clear_video(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.video.is_none() {
            return false;
        }
        let generation = inner.reset();
        inner.video = None;

        info!(generation = generation.value(), "Video cleared");
        self.emit(SessionEvent::VideoCleared);
        self.announce_reset(&mut inner, generation);
        true
    }

    fn announce_reset(&self, inner: &mut SessionInner, generation: Generation) {
        self.emit(SessionEvent::StateChanged {
            state: PipelineState::Idle,
        });
        self.apply_locked(
            inner,
            Tagged::new(generation, CollectionUpdate::ReplaceAll(Vec::new())),
        );
        self.emit(SessionEvent::StoryboardCleared);
    }

    /// Change the number of frames sampled per batch run.
    pub async fn set_frame_count(&self, count: u32) -> PipelineResult<()> {
        if !self.allowed_frame_counts.contains(&count) {
            return Err(PipelineError::InvalidFrameCount(count));
        }
        let mut inner = self.inner.lock().await;
        if inner.machine.state() == PipelineState::Analyzing {
            return Err(PipelineError::Busy);
        }
        if inner.frame_count == count {
            return Ok(());
        }
        inner.frame_count = count;
        self.emit(SessionEvent::FrameCountChanged { frame_count: count });
        Ok(())
    }

    /// Admit a batch run: mint the ticket, open a new generation, clear the
    /// storyboard, sample timestamps and replace the collection with
    /// placeholders.
    ///
    /// Work tagged with an earlier generation (a previous run's storyboard,
    /// a capture admitted before this run) is stale from here on.
    ///
    /// `None` when there is no video with a known duration or a run is
    /// already in progress.
    pub async fn begin_run(&self) -> Option<BatchRun> {
        let mut inner = self.inner.lock().await;
        let video = inner.video.clone()?;
        let duration = video.descriptor.duration;
        if !duration.is_finite() || duration <= 0.0 {
            return None;
        }

        let ticket = inner.machine.begin_run()?;
        let generation = inner.generation.next();
        inner.generation = generation;

        let timestamps = sample_timestamps(duration, inner.frame_count);
        let placeholders: Vec<ResultItem> =
            timestamps.iter().map(|&t| ResultItem::placeholder(t)).collect();
        let item_ids = placeholders.iter().map(|item| item.id.clone()).collect();

        inner.storyboard = None;
        inner.storyboard_pending = false;
        inner.notification = None;

        self.emit(SessionEvent::StateChanged {
            state: PipelineState::Analyzing,
        });
        self.emit(SessionEvent::StoryboardCleared);
        self.apply_locked(
            &mut inner,
            Tagged::new(generation, CollectionUpdate::ReplaceAll(placeholders)),
        );

        Some(BatchRun {
            ticket,
            generation,
            source: video.source,
            timestamps,
            item_ids,
        })
    }

    /// `Analyzing -> Complete`. False when the run was superseded.
    pub async fn finish_run(&self, ticket: RunTicket) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.machine.complete(ticket) {
            return false;
        }
        self.emit(SessionEvent::StateChanged {
            state: PipelineState::Complete,
        });
        true
    }

    /// `Analyzing -> Idle` with one user-visible notification.
    pub async fn abort_run(&self, ticket: RunTicket, message: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if !inner.machine.abort(ticket) {
            return false;
        }
        inner.notification = Some(message.to_string());
        self.emit(SessionEvent::StateChanged {
            state: PipelineState::Idle,
        });
        self.emit(SessionEvent::notification(message));
        true
    }

    /// Admit an ad-hoc capture at `position`.
    ///
    /// `None` without a video, at position zero (or a non-finite position),
    /// or while a batch run is analyzing.
    pub async fn capture_target(&self, position: f64) -> Option<CaptureTarget> {
        if !position.is_finite() || position <= 0.0 {
            return None;
        }
        let inner = self.inner.lock().await;
        if inner.machine.state() == PipelineState::Analyzing {
            return None;
        }
        let video = inner.video.as_ref()?;
        Some(CaptureTarget {
            generation: inner.generation,
            source: video.source.clone(),
            position,
        })
    }

    /// Apply a collection update. Stale and unmatched updates are dropped.
    pub async fn apply(&self, tagged: Tagged) -> bool {
        let mut inner = self.inner.lock().await;
        self.apply_locked(&mut inner, tagged)
    }

    fn apply_locked(&self, inner: &mut SessionInner, tagged: Tagged) -> bool {
        match reduce(inner.generation, &inner.items, tagged) {
            Reduction::Applied { items, change } => {
                match change {
                    Change::Reset => self.emit(SessionEvent::ItemsReset {
                        items: items.clone(),
                    }),
                    Change::Added(item) => self.emit(SessionEvent::ItemAdded { item }),
                    Change::Updated(updated) => {
                        for item in updated {
                            self.emit(SessionEvent::ItemUpdated { item });
                        }
                    }
                }
                inner.items = items;
                true
            }
            Reduction::Stale => {
                metrics::record_stale_update();
                debug!("Discarded stale collection update");
                false
            }
            Reduction::Unmatched => {
                debug!("Collection update matched no item");
                false
            }
        }
    }

    /// Convenience wrapper for [`AnalysisSession::apply`].
    pub async fn update(&self, generation: Generation, update: CollectionUpdate) -> bool {
        self.apply(Tagged::new(generation, update)).await
    }

    /// Mark storyboard synthesis as started.
    pub async fn begin_storyboard(&self, generation: Generation) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return false;
        }
        inner.storyboard_pending = true;
        self.emit(SessionEvent::StoryboardStarted);
        true
    }

    /// Record the synthesis outcome. `None` leaves the storyboard unset.
    ///
    /// Refused once a newer run or video has opened another generation.
    pub async fn finish_storyboard(&self, generation: Generation, text: Option<String>) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation || !inner.storyboard_pending {
            return false;
        }
        inner.storyboard_pending = false;
        inner.storyboard = text.clone();
        match text {
            Some(text) => self.emit(SessionEvent::StoryboardReady { text }),
            None => self.emit(SessionEvent::StoryboardCleared),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use vrev_media::{CaptureSize, MediaResult, VideoInfo};
    use vrev_models::VideoId;

    struct NullSource;

    #[async_trait]
    impl FrameSource for NullSource {
        async fn metadata(&self) -> MediaResult<VideoInfo> {
            Ok(VideoInfo {
                duration: 10.0,
                width: 2,
                height: 2,
            })
        }

        async fn grab(&self, _timestamp: f64, _size: CaptureSize) -> MediaResult<Vec<u8>> {
            Ok(vec![0])
        }
    }

    fn video(duration: f64) -> ActiveVideo {
        ActiveVideo {
            descriptor: VideoDescriptor {
                video_id: VideoId::new(),
                file_name: "clip.mp4".to_string(),
                duration,
                width: 2,
                height: 2,
            },
            source: Arc::new(NullSource),
        }
    }

    fn session() -> AnalysisSession {
        AnalysisSession::new(&PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_begin_run_requires_video() {
        assert!(session().begin_run().await.is_none());
    }

    #[tokio::test]
    async fn test_begin_run_requires_duration() {
        let session = session();
        session.load_video(video(0.0)).await;
        assert!(session.begin_run().await.is_none());
        assert_eq!(session.state().await, PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_begin_run_materializes_placeholders() {
        let session = session();
        session.set_frame_count(12).await.unwrap();
        session.load_video(video(24.0)).await;

        let run = session.begin_run().await.unwrap();
        assert_eq!(run.timestamps.len(), 12);
        assert_eq!(run.item_ids.len(), 12);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Analyzing);
        assert_eq!(snapshot.items.len(), 12);
        assert!(snapshot.items.iter().all(|i| !i.has_thumbnail()));
        assert_eq!(snapshot.items[1].timestamp, 2.0);

        // second admission refused while analyzing
        assert!(session.begin_run().await.is_none());
    }

    #[tokio::test]
    async fn test_frame_count_rules() {
        let session = session();
        assert!(matches!(
            session.set_frame_count(10).await,
            Err(PipelineError::InvalidFrameCount(10))
        ));

        session.load_video(video(5.0)).await;
        let _run = session.begin_run().await.unwrap();
        assert!(matches!(
            session.set_frame_count(16).await,
            Err(PipelineError::Busy)
        ));
    }

    #[tokio::test]
    async fn test_load_video_resets_and_staleness() {
        let session = session();
        let first = session.load_video(video(5.0)).await;
        let run = session.begin_run().await.unwrap();

        let second = session.load_video(video(7.0)).await;
        assert_ne!(first, second);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert!(snapshot.items.is_empty());

        // late completion from the superseded run is discarded
        let applied = session
            .update(
                first,
                CollectionUpdate::MarkFailed {
                    id: run.item_ids[0].clone(),
                    message: "x".to_string(),
                },
            )
            .await;
        assert!(!applied);
        assert!(!session.finish_run(run.ticket).await);
        assert_eq!(session.state().await, PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_capture_target_guards() {
        let session = session();
        assert!(session.capture_target(1.0).await.is_none());

        session.load_video(video(5.0)).await;
        assert!(session.capture_target(0.0).await.is_none());
        assert!(session.capture_target(f64::NAN).await.is_none());
        assert!(session.capture_target(1.5).await.is_some());

        let _run = session.begin_run().await.unwrap();
        assert!(session.capture_target(1.5).await.is_none());
    }

    #[tokio::test]
    async fn test_abort_sets_notification() {
        let session = session();
        session.load_video(video(5.0)).await;
        let (_, mut rx) = session.subscribe().await;

        let run = session.begin_run().await.unwrap();
        assert!(session.abort_run(run.ticket, "视频处理失败，请重试。").await);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.state, PipelineState::Idle);
        assert_eq!(snapshot.notification.as_deref(), Some("视频处理失败，请重试。"));
        // placeholders are left in place
        assert_eq!(snapshot.items.len(), 8);

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(kinds.last().copied(), Some("notification"));
    }

    #[tokio::test]
    async fn test_clear_video() {
        let session = session();
        assert!(!session.clear_video().await);
        session.load_video(video(5.0)).await;
        assert!(session.clear_video().await);
        assert!(session.snapshot().await.video.is_none());
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_reset_and_run_replace_items_through_reducer() {
        let session = session();
        let (_, mut rx) = session.subscribe().await;

        session.load_video(video(8.0)).await;
        let kinds: Vec<&str> = drain(&mut rx).iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec!["video_loaded", "state_changed", "items_reset", "storyboard_cleared"]
        );

        let run = session.begin_run().await.unwrap();
        let events = drain(&mut rx);
        let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec!["state_changed", "storyboard_cleared", "items_reset"]);
        match events.last() {
            Some(SessionEvent::ItemsReset { items }) => {
                let ids: Vec<ResultId> = items.iter().map(|i| i.id.clone()).collect();
                assert_eq!(ids, run.item_ids);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_each_run_opens_a_generation() {
        let session = session();
        let loaded = session.load_video(video(5.0)).await;
        let target = session.capture_target(2.0).await.unwrap();
        assert_eq!(target.generation, loaded);

        let run = session.begin_run().await.unwrap();
        assert_ne!(run.generation, loaded);
        assert!(session.finish_run(run.ticket).await);

        // a capture admitted before the run lands nowhere
        let late = ResultItem::captured(2.0, vec![2]);
        assert!(
            !session
                .update(target.generation, CollectionUpdate::Prepend(late))
                .await
        );
        assert_eq!(session.snapshot().await.items.len(), 8);

        // nor does a storyboard for the earlier collection
        assert!(!session.begin_storyboard(loaded).await);
        assert!(session.begin_storyboard(run.generation).await);
        assert!(!session.finish_storyboard(loaded, Some("old".to_string())).await);
        assert!(session.finish_storyboard(run.generation, Some("new".to_string())).await);
        assert_eq!(session.snapshot().await.storyboard.as_deref(), Some("new"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_snapshot_plus_events_tracks_state() {
        let session = AnalysisSession::new(&PipelineConfig {
            event_capacity: 1024,
            ..Default::default()
        });
        let generation = session.load_video(video(5.0)).await;

        let writer = {
            let session = session.clone();
            tokio::spawn(async move {
                for i in 0..200u32 {
                    let item = ResultItem::captured(1.0 + f64::from(i) / 1000.0, vec![1]);
                    session
                        .update(generation, CollectionUpdate::Prepend(item))
                        .await;
                }
            })
        };

        let mut observers = Vec::new();
        for _ in 0..20 {
            observers.push(session.subscribe().await);
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        let expected: Vec<ResultId> = session
            .snapshot()
            .await
            .items
            .into_iter()
            .map(|i| i.id)
            .collect();
        for (snapshot, mut rx) in observers {
            let mut ids: Vec<ResultId> = snapshot.items.into_iter().map(|i| i.id).collect();
            for event in drain(&mut rx) {
                match event {
                    SessionEvent::ItemAdded { item } => ids.insert(0, item.id),
                    SessionEvent::ItemsReset { items } => {
                        ids = items.into_iter().map(|i| i.id).collect()
                    }
                    _ => {}
                }
            }
            assert_eq!(ids, expected);
        }
    }
}
