//! Label classifier: ranked vision labels to a single category

use std::sync::Arc;
use tracing::debug;

use crate::models::{Category, ClassificationResult, ColorCandidate, Label};
use crate::taxonomy::Taxonomy;

/// Picks a category for an image from its ranked labels
#[derive(Debug, Clone)]
pub struct LabelClassifier {
    taxonomy: Arc<Taxonomy>,
}

impl LabelClassifier {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self { taxonomy }
    }

    /// Classify one image
    ///
    /// Labels are taken in the order given; the analyzer delivers them
    /// confidence-sorted. The first label the taxonomy resolves decides the
    /// category, even when a later label would be a more specific match.
    pub fn classify_image(&self, labels: &[Label], colors: &[ColorCandidate]) -> ClassificationResult {
        if labels
            .windows(2)
            .any(|pair| pair[0].confidence < pair[1].confidence)
        {
            debug!("Labels are not confidence-sorted; classifying in the order given");
        }

        let category = labels
            .iter()
            .find_map(|label| self.taxonomy.classify(&label.text))
            .unwrap_or(Category::Unknown);

        debug!(%category, label_count = labels.len(), "Classified image labels");

        ClassificationResult {
            labels: labels.to_vec(),
            category,
            colors: normalize_weights(colors),
        }
    }
}

/// Clamp weights into `0..=1` and scale them down when they sum above 1
fn normalize_weights(colors: &[ColorCandidate]) -> Vec<ColorCandidate> {
    let clamped: Vec<ColorCandidate> = colors
        .iter()
        .map(|candidate| {
            let weight = if candidate.weight.is_finite() {
                candidate.weight.clamp(0.0, 1.0)
            } else {
                0.0
            };
            ColorCandidate::new(candidate.rgb, weight)
        })
        .collect();

    let total: f32 = clamped.iter().map(|candidate| candidate.weight).sum();
    if total <= 1.0 {
        return clamped;
    }

    clamped
        .into_iter()
        .map(|candidate| ColorCandidate::new(candidate.rgb, candidate.weight / total))
        .collect()
}
