mod error;
mod labels;
mod session;

pub mod scores;
pub mod transform;

pub use error::ClassifierError;
pub use labels::LabelTable;
pub use session::SessionPool;
pub use transform::{ImageTransform, IMAGENET_MEAN, IMAGENET_STD};
