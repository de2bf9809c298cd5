use crate::{
    config::{ModelConfig, ModelOutput},
    model_service::ModelService,
};
use async_trait::async_trait;
use bytes::Bytes;
use naksha_core::{scores::softmax, ClassifierError, ImageTransform, LabelTable, SessionPool};

/// Metadata key under which YOLO exports store their class names.
const NAMES_METADATA_KEY: &str = "names";

#[derive(Clone)]
pub struct OrtModelService {
    pool: SessionPool,
    transform: ImageTransform,
    output: ModelOutput,
}

impl OrtModelService {
    pub fn new(model_config: &ModelConfig) -> Result<Self, ClassifierError> {
        let pool = SessionPool::new(model_config.get_path(), model_config.num_instances)?;

        Ok(Self {
            pool,
            transform: model_config.transform(),
            output: model_config.output,
        })
    }

    /// Class names stored in the model file by the exporter, if present.
    pub fn embedded_labels(&self) -> Result<Option<LabelTable>, ClassifierError> {
        self.pool
            .metadata(NAMES_METADATA_KEY)?
            .map(|names| LabelTable::from_names_metadata(&names).map_err(ClassifierError::ModelLoad))
            .transpose()
    }

    fn classify(&self, image_data: &[u8]) -> Result<Vec<f32>, ClassifierError> {
        let image = ImageTransform::decode(image_data)?;
        let input = self.transform.apply(&image)?;
        let scores = self.pool.run(&input)?;

        Ok(normalize(self.output, scores))
    }
}

/// Turns raw model output into class probabilities.
fn normalize(output: ModelOutput, scores: Vec<f32>) -> Vec<f32> {
    match output {
        ModelOutput::Probabilities => scores,
        ModelOutput::Logits => softmax(&scores),
    }
}

#[async_trait]
impl ModelService for OrtModelService {
    async fn predict(&self, image_data: Bytes) -> Result<Vec<f32>, ClassifierError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.classify(&image_data))
            .await
            .map_err(|e| ClassifierError::Inference(format!("inference task failed: {}", e)))?
    }
}
