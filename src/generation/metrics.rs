use crate::history::Metrics;
use crate::rag::RetrievedChunk;

/// Share of retrieved chunks at or above `threshold`, reported as both
/// precision and recall. Recall has no corpus-wide ground truth here, so the
/// two are the same number.
pub fn retrieval_metrics(chunks: &[RetrievedChunk], threshold: f32) -> Metrics {
    if chunks.is_empty() {
        return Metrics::default();
    }

    let relevant = chunks.iter().filter(|chunk| chunk.score >= threshold).count();
    let share = round3(relevant as f64 / chunks.len() as f64);
    Metrics {
        precision: share,
        recall: share,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
