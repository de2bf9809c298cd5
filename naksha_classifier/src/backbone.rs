use naksha_core::{ClassifierError, SessionPool};
use ndarray::{Array, Ix4};

/// A network mapping one preprocessed image to raw class scores.
pub trait Backbone: Send + Sync {
    fn forward(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ClassifierError>;
}

impl Backbone for SessionPool {
    fn forward(&self, input: &Array<f32, Ix4>) -> Result<Vec<f32>, ClassifierError> {
        self.run(input)
    }
}
