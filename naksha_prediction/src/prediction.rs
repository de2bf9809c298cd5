use naksha_core::{scores::argmax, ClassifierError, LabelTable};
use serde::{ser::SerializeMap, Serialize, Serializer};

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub predicted_class: String,
    pub confidence: f32,
    pub probabilities: ClassProbabilities,
}

/// Label to probability pairs, serialised as a JSON object in class-index
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassProbabilities(Vec<(String, f32)>);

impl ClassProbabilities {
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(label, prob)| (label.as_str(), *prob))
    }
}

impl Serialize for ClassProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, prob) in &self.0 {
            map.serialize_entry(label, prob)?;
        }
        map.end()
    }
}

impl PredictionResponse {
    /// Pairs every label with its probability and picks the most likely
    /// class. The model must produce exactly one score per label.
    pub fn from_probabilities(
        labels: &LabelTable,
        probabilities: Vec<f32>,
    ) -> Result<Self, ClassifierError> {
        if probabilities.len() > labels.len() {
            return Err(ClassifierError::LabelMapping {
                index: labels.len(),
                table_len: labels.len(),
            });
        }
        if probabilities.len() < labels.len() {
            return Err(ClassifierError::Inference(format!(
                "model produced {} scores for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }
        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(ClassifierError::Inference(
                "model produced a non-finite score".to_string(),
            ));
        }

        let (index, confidence) = argmax(&probabilities)
            .ok_or_else(|| ClassifierError::Inference("model produced no scores".to_string()))?;
        let predicted_class = labels.get(index)?.to_string();

        let probabilities = labels
            .as_slice()
            .iter()
            .cloned()
            .zip(probabilities)
            .collect();

        Ok(Self {
            predicted_class,
            confidence,
            probabilities: ClassProbabilities(probabilities),
        })
    }
}
