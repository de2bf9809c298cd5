use crate::config::LabelsConfig;
use naksha_core::{ClassifierError, LabelTable};

#[derive(Debug)]
pub struct ServiceState {
    class_labels: LabelTable,
}

impl ServiceState {
    /// Labels come from the configured file when there is one, otherwise
    /// from the labels embedded in the model.
    pub fn new(
        labels_cfg: &LabelsConfig,
        embedded_labels: Option<LabelTable>,
    ) -> Result<ServiceState, ClassifierError> {
        let class_labels = match labels_cfg.get_path() {
            Some(path) => LabelTable::from_file(&path).map_err(|e| {
                ClassifierError::ModelLoad(format!("Failed to load labels from {:?}: {}", path, e))
            })?,
            None => embedded_labels.ok_or_else(|| {
                ClassifierError::ModelLoad(
                    "No labels file configured and the model carries no class names".to_string(),
                )
            })?,
        };

        tracing::info!("Loaded {} class labels", class_labels.len());

        Ok(Self::from_labels(class_labels))
    }

    pub fn from_labels(class_labels: LabelTable) -> Self {
        Self { class_labels }
    }

    pub fn get_labels(&self) -> &LabelTable {
        &self.class_labels
    }
}
