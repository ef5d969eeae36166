//! Single-worker analysis queue.
//!
//! Batch frames and ad-hoc captures both submit here. One worker task drains
//! the channel, so at most one remote analysis call is in flight.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use vrev_ai::FrameAnalyzer;
use vrev_models::AnalysisRecord;

use crate::error::{PipelineError, PipelineResult};

struct AnalysisJob {
    png: Vec<u8>,
    reply: oneshot::Sender<PipelineResult<AnalysisRecord>>,
}

/// Handle for submitting frames to the analysis worker.
#[derive(Clone)]
pub struct AnalysisQueue {
    tx: mpsc::Sender<AnalysisJob>,
}

impl AnalysisQueue {
    /// Start the worker task. It exits once every queue handle is dropped.
    pub fn spawn(
        analyzer: Arc<dyn FrameAnalyzer>,
        timeout: Duration,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(worker(analyzer, timeout, rx));
        (Self { tx }, handle)
    }

    /// Submit a frame and wait for its analysis.
    pub async fn analyze(&self, png: Vec<u8>) -> PipelineResult<AnalysisRecord> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(AnalysisJob { png, reply })
            .await
            .map_err(|_| PipelineError::QueueClosed)?;
        rx.await.map_err(|_| PipelineError::QueueClosed)?
    }
}

async fn worker(
    analyzer: Arc<dyn FrameAnalyzer>,
    timeout: Duration,
    mut rx: mpsc::Receiver<AnalysisJob>,
) {
    info!("Analysis worker started");
    while let Some(job) = rx.recv().await {
        debug!(bytes = job.png.len(), "Analyzing frame");
        let result = match tokio::time::timeout(timeout, analyzer.analyze_frame(&job.png)).await {
            Ok(result) => result.map_err(PipelineError::from),
            Err(_) => Err(PipelineError::Timeout(timeout.as_secs())),
        };
        // Requester may have gone away; nothing to do then
        let _ = job.reply.send(result);
    }
    info!("Analysis worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vrev_ai::{AiError, AiResult};

    /// Tracks how many calls overlap.
    struct CountingAnalyzer {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl CountingAnalyzer {
        fn new(delay: Duration) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                delay,
            }
        }
    }

    #[async_trait]
    impl FrameAnalyzer for CountingAnalyzer {
        async fn analyze_frame(&self, png: &[u8]) -> AiResult<AnalysisRecord> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if png.is_empty() {
                return Err(AiError::EmptyResponse);
            }
            Ok(AnalysisRecord {
                visual_description: format!("frame {}", png[0]),
                ai_prompt: "p".to_string(),
                character_prompt: None,
                technical_breakdown: "t".to_string(),
                color_palette: vec!["#000000".into(), "#FFFFFF".into(), "#FF0000".into()],
            })
        }
    }

    #[tokio::test]
    async fn test_one_call_in_flight() {
        let analyzer = Arc::new(CountingAnalyzer::new(Duration::from_millis(10)));
        let (queue, _worker) = AnalysisQueue::spawn(analyzer.clone(), Duration::from_secs(5), 8);

        let mut handles = Vec::new();
        for i in 0..5u8 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move { queue.analyze(vec![i]).await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }

        assert_eq!(analyzer.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_returned_to_caller() {
        let analyzer = Arc::new(CountingAnalyzer::new(Duration::ZERO));
        let (queue, _worker) = AnalysisQueue::spawn(analyzer, Duration::from_secs(5), 1);

        let err = queue.analyze(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ai(AiError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_timeout_is_an_ordinary_failure() {
        let analyzer = Arc::new(CountingAnalyzer::new(Duration::from_secs(5)));
        let (queue, _worker) = AnalysisQueue::spawn(analyzer, Duration::from_millis(20), 1);

        let err = queue.analyze(vec![1]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout(_)));
    }
}
