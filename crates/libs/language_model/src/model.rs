use crate::{InlineImage, VisionResult};
use async_trait::async_trait;

/// Anything that answers a text instruction about zero or more images with free-form text.
///
/// Implementations are stateless between calls, so a single instance can serve
/// concurrent requests.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn generate(&self, prompt: &str, images: &[InlineImage]) -> VisionResult<String>;

    fn model_name(&self) -> &str;
}
