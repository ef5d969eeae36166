//! Storyboard synthesis step.

use vrev_ai::StoryboardSynthesizer;
use vrev_models::{messages, StoryboardShot};

use crate::logging::RunLogger;
use crate::metrics;
use crate::reducer::Generation;
use crate::session::AnalysisSession;

/// Synthesize the storyboard for a finished batch.
///
/// Skipped when `shots` is empty. A failure is only logged; the storyboard
/// stays unset. Returns whether text was stored.
pub async fn synthesize_storyboard(
    session: &AnalysisSession,
    synthesizer: &dyn StoryboardSynthesizer,
    generation: Generation,
    mut shots: Vec<StoryboardShot>,
    logger: &RunLogger,
) -> bool {
    if shots.is_empty() {
        logger.log_warning("No frame analyzed successfully, skipping storyboard");
        return false;
    }
    shots.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    if !session.begin_storyboard(generation).await {
        return false;
    }
    logger.log_progress(&format!("Synthesizing storyboard from {} shots", shots.len()));

    match synthesizer.synthesize(&shots).await {
        Ok(text) => {
            metrics::record_storyboard(true);
            logger.log_completion("Storyboard ready");
            session.finish_storyboard(generation, Some(text)).await
        }
        Err(e) => {
            metrics::record_storyboard(false);
            logger.log_error(&format!("{}: {}", messages::STORYBOARD_FAILED, e));
            session.finish_storyboard(generation, None).await;
            false
        }
    }
}
