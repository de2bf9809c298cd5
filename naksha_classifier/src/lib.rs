//! Local top-3 building classifier on top of a general-purpose ImageNet
//! network (ResNet-50 exported to ONNX).

mod backbone;
mod classifier;

pub use backbone::Backbone;
pub use classifier::{BuildingClassifier, BuildingPrediction, PredictOutcome, TOP_K};
