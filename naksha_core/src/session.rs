use crate::error::ClassifierError;
use ndarray::{Array, Ix4};
#[cfg(feature = "tensorrt")]
use ort::execution_providers::TensorRTExecutionProvider;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::TensorRef,
};
use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Round-robin pool of ONNX sessions loaded from the same model file.
///
/// Sessions are never mutated after loading apart from running them, which
/// `ort` requires exclusive access for; each one sits behind its own mutex.
#[derive(Clone)]
pub struct SessionPool {
    sessions: Arc<Vec<Mutex<Session>>>,
    counter: Arc<AtomicUsize>,
}

fn model_load_error(e: impl std::fmt::Display) -> ClassifierError {
    ClassifierError::ModelLoad(e.to_string())
}

impl SessionPool {
    pub fn new(model_path: impl AsRef<Path>, num_instances: usize) -> Result<Self, ClassifierError> {
        let model_path = model_path.as_ref();
        if !model_path.exists() {
            return Err(ClassifierError::ModelLoad(format!(
                "Model file not found: {:?}",
                model_path
            )));
        }

        let num_instances = num_instances.max(1);
        let sessions = (0..num_instances)
            .map(|_| {
                let builder = Session::builder().map_err(model_load_error)?;
                #[cfg(feature = "tensorrt")]
                let builder = builder
                    .with_execution_providers([TensorRTExecutionProvider::default()
                        .with_engine_cache(true)
                        .build()])
                    .map_err(model_load_error)?;
                let session = builder
                    .with_optimization_level(GraphOptimizationLevel::Level3)
                    .map_err(model_load_error)?
                    .commit_from_file(model_path)
                    .map_err(model_load_error)?;
                Ok(Mutex::new(session))
            })
            .collect::<Result<Vec<_>, ClassifierError>>()?;

        tracing::info!(
            "Created {} ONNX sessions from {}",
            num_instances,
            model_path.display()
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            counter: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Custom metadata entry stored in the model file, if any.
    pub fn metadata(&self, key: &str) -> Result<Option<String>, ClassifierError> {
        let session = self.sessions[0]
            .lock()
            .map_err(|e| ClassifierError::ModelLoad(format!("session mutex poisoned: {}", e)))?;
        let metadata = session.metadata().map_err(model_load_error)?;
        let value = metadata.custom(key).map_err(model_load_error)?;

        Ok(value)
    }

    /// Runs one forward pass and returns the scores of the single image in
    /// the batch. The output may be `[classes]`, `[1, classes]` or any
    /// shape whose leading dimensions are all 1.
    pub fn run(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ClassifierError> {
        let index = self.counter.fetch_add(1, Ordering::SeqCst) % self.sessions.len();
        let mut session = self.sessions[index]
            .lock()
            .map_err(|e| ClassifierError::Inference(format!("session mutex poisoned: {}", e)))?;

        tracing::debug!("Handling request with session {}", index);
        let owned_buffer;
        let input_view = if input.view().is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.as_standard_layout().to_owned();
            owned_buffer.view()
        };

        let tensor_ref = TensorRef::from_array_view(input_view)
            .map_err(|e| ClassifierError::Inference(format!("failed to build tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![tensor_ref])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("failed to extract tensor: {}", e)))?;

        let shape = output.shape();
        let leading = &shape[..shape.len().saturating_sub(1)];
        if shape.is_empty() || leading.iter().any(|&dim| dim != 1) {
            return Err(ClassifierError::Inference(format!(
                "unexpected output shape {:?}, expected a single row of class scores",
                shape
            )));
        }

        let scores = output.iter().copied().collect();

        Ok(scores)
    }
}
