use async_trait::async_trait;
use bytes::Bytes;
use naksha_core::ClassifierError;

#[async_trait]
pub trait ModelService: Send + Sync + 'static {
    /// Class probabilities for one encoded image, in class-index order.
    async fn predict(&self, image_data: Bytes) -> Result<Vec<f32>, ClassifierError>;
}
