use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Class index {index} has no entry in the label table ({table_len} labels)")]
    LabelMapping { index: usize, table_len: usize },
}

impl ClassifierError {
    /// Short machine-readable name of the error family.
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifierError::Decode(_) => "decode",
            ClassifierError::ModelLoad(_) => "model_load",
            ClassifierError::Inference(_) => "inference",
            ClassifierError::LabelMapping { .. } => "label_mapping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_mapping_message() {
        let err = ClassifierError::LabelMapping {
            index: 417,
            table_len: 5,
        };

        assert_eq!(err.kind(), "label_mapping");
        assert_eq!(
            err.to_string(),
            "Class index 417 has no entry in the label table (5 labels)"
        );
    }
}
