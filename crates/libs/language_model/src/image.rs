use crate::VisionResult;
use base64::{Engine as _, engine::general_purpose};
use std::path::Path;
use tokio::fs;

/// Encoded image bytes sent along with a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Wrap already encoded bytes, sniffing the mime type from the content.
    #[must_use]
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let mime_type = infer::get(&data)
            .map_or("image/png", |kind| kind.mime_type())
            .to_string();
        Self { mime_type, data }
    }

    pub async fn from_path(path: &Path) -> VisionResult<Self> {
        let data = fs::read(path).await?;
        Ok(Self::from_bytes(data))
    }

    #[must_use]
    pub fn data_url(&self) -> String {
        let b64 = general_purpose::STANDARD.encode(&self.data);
        format!("data:{};base64,{b64}", self.mime_type)
    }
}
