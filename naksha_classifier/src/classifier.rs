use crate::backbone::Backbone;
use image::DynamicImage;
use naksha_core::{
    scores::{softmax, top_k},
    ClassifierError, ImageTransform, LabelTable, SessionPool,
};
use serde::Serialize;
use std::path::Path;

/// Number of ranked predictions returned per image.
pub const TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingPrediction {
    pub building: String,
    pub confidence: f32,
}

/// JSON shape of a prediction: the ranked list, or `{"error": "..."}`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictOutcome {
    Ranked(Vec<BuildingPrediction>),
    Failed { error: String },
}

impl From<Result<Vec<BuildingPrediction>, ClassifierError>> for PredictOutcome {
    fn from(result: Result<Vec<BuildingPrediction>, ClassifierError>) -> Self {
        match result {
            Ok(predictions) => PredictOutcome::Ranked(predictions),
            Err(e) => PredictOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Top-3 building classifier with ImageNet preprocessing.
///
/// The default label table only names five classes while an ImageNet
/// backbone scores 1000. Any top-3 index past the table is reported as
/// [`ClassifierError::LabelMapping`] instead of being guessed; pass a
/// table matching the model's outputs to avoid it.
pub struct BuildingClassifier<B = SessionPool> {
    backbone: B,
    transform: ImageTransform,
    labels: LabelTable,
}

impl BuildingClassifier<SessionPool> {
    pub fn load(model_path: impl AsRef<Path>, labels: LabelTable) -> Result<Self, ClassifierError> {
        let pool = SessionPool::new(model_path, 1)?;

        Ok(Self::with_backbone(pool, labels))
    }
}

impl<B: Backbone> BuildingClassifier<B> {
    pub fn with_backbone(backbone: B, labels: LabelTable) -> Self {
        Self {
            backbone,
            transform: ImageTransform::imagenet(),
            labels,
        }
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    pub fn predict(
        &self,
        image_path: impl AsRef<Path>,
    ) -> Result<Vec<BuildingPrediction>, ClassifierError> {
        let image = ImageTransform::open(image_path)?;
        self.predict_image(&image)
    }

    pub fn predict_image(
        &self,
        image: &DynamicImage,
    ) -> Result<Vec<BuildingPrediction>, ClassifierError> {
        let input = self.transform.apply(image)?;
        let logits = self.backbone.forward(&input)?;

        if logits.len() < TOP_K {
            return Err(ClassifierError::Inference(format!(
                "model produced {} scores, need at least {}",
                logits.len(),
                TOP_K
            )));
        }
        if let Some(index) = logits.iter().position(|score| !score.is_finite()) {
            return Err(ClassifierError::Inference(format!(
                "model produced a non-finite score {} at index {}",
                logits[index], index
            )));
        }
        if logits.len() > self.labels.len() {
            tracing::warn!(
                "Model scores {} classes but the label table only names {}",
                logits.len(),
                self.labels.len()
            );
        }

        let probabilities = softmax(&logits);
        top_k(&probabilities, TOP_K)
            .into_iter()
            .map(|(index, confidence)| {
                Ok(BuildingPrediction {
                    building: self.labels.get(index)?.to_string(),
                    confidence,
                })
            })
            .collect()
    }

    /// Like [`predict`](Self::predict), with failures folded into the
    /// outcome instead of returned.
    pub fn predict_outcome(&self, image_path: impl AsRef<Path>) -> PredictOutcome {
        let image_path = image_path.as_ref();
        let result = self.predict(image_path);
        if let Err(e) = &result {
            tracing::debug!("Prediction for {} failed: {}", image_path.display(), e);
        }
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use ndarray::{Array, Ix4};

    struct MockBackbone {
        logits: Vec<f32>,
    }

    impl Backbone for MockBackbone {
        fn forward(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ClassifierError> {
            assert_eq!(input.shape(), &[1, 3, 224, 224]);
            Ok(self.logits.clone())
        }
    }

    fn classifier(logits: Vec<f32>) -> BuildingClassifier<MockBackbone> {
        BuildingClassifier::with_backbone(MockBackbone { logits }, LabelTable::campus_buildings())
    }

    fn black_image() -> DynamicImage {
        DynamicImage::ImageRgb8(ImageBuffer::from_pixel(224, 224, Rgb([0, 0, 0])))
    }

    #[test]
    fn test_black_image_top_three() {
        let classifier = classifier(vec![3.0, 1.0, 2.0, 0.5, 0.1]);

        let predictions = classifier.predict_image(&black_image()).unwrap();

        assert_eq!(predictions.len(), TOP_K);
        let buildings: Vec<&str> = predictions.iter().map(|p| p.building.as_str()).collect();
        assert_eq!(buildings, vec!["Main Building", "Science Block", "Library"]);
        assert!(predictions
            .windows(2)
            .all(|w| w[0].confidence >= w[1].confidence));
        assert!(predictions
            .iter()
            .all(|p| (0.0..=1.0).contains(&p.confidence)
                && classifier.labels().contains(&p.building)));
    }

    #[test]
    fn test_index_outside_label_table() {
        let mut logits = vec![0.0; 1000];
        logits[417] = 9.0;
        let classifier = classifier(logits);

        let result = classifier.predict_image(&black_image());

        assert!(matches!(
            result,
            Err(ClassifierError::LabelMapping {
                index: 417,
                table_len: 5
            })
        ));
    }

    #[test]
    fn test_too_few_outputs() {
        let classifier = classifier(vec![0.3, 0.7]);

        let result = classifier.predict_image(&black_image());

        assert!(matches!(result, Err(ClassifierError::Inference(_))));
    }

    #[test]
    fn test_non_finite_logits() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let classifier = classifier(vec![1.0, bad, 0.5, 0.2, -0.3]);

            let result = classifier.predict_image(&black_image());

            assert!(matches!(result, Err(ClassifierError::Inference(_))));
        }
    }

    #[test]
    fn test_predict_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("building.png");
        ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(320, 240, Rgb([120, 80, 40]))
            .save(&path)
            .unwrap();
        let classifier = classifier(vec![0.1, 0.2, 0.3, 0.4, 0.5]);

        let predictions = classifier.predict(&path).unwrap();

        assert_eq!(predictions[0].building, "Cafeteria");
        assert_eq!(predictions[2].building, "Science Block");
    }

    #[test]
    fn test_outcome_wraps_errors() {
        let classifier = classifier(vec![0.1, 0.2, 0.3, 0.4, 0.5]);

        let outcome = classifier.predict_outcome("/nonexistent/naksha/building.jpg");

        let json = serde_json::to_value(&outcome).unwrap();
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to decode image"));
    }

    #[test]
    fn test_outcome_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("building.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();
        let classifier = classifier(vec![0.1, 0.2, 0.3, 0.4, 0.5]);

        let outcome = classifier.predict_outcome(&path);

        assert!(matches!(outcome, PredictOutcome::Failed { .. }));
    }

    #[test]
    fn test_outcome_serializes_ranked_list() {
        let outcome = PredictOutcome::Ranked(vec![BuildingPrediction {
            building: "Library".to_string(),
            confidence: 0.5,
        }]);

        let json = serde_json::to_string(&outcome).unwrap();

        assert_eq!(json, r#"[{"building":"Library","confidence":0.5}]"#);
    }
}
