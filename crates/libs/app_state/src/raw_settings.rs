use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct RawSettings {
    pub vision: VisionSettings,
    pub annotation: RawAnnotationSettings,
    pub logging: LoggingSettings,
    #[serde(default)]
    pub secrets: SecretSettings,
}

/// Where the vision model lives and how it is sampled.
#[derive(Debug, Deserialize, Clone)]
pub struct VisionSettings {
    /// Cloud project that hosts the model endpoint.
    pub project: String,
    /// Region of the endpoint, e.g. `us-central1` or `global`.
    pub region: String,
    pub model: String,
    /// Overrides the endpoint derived from `project` and `region`.
    #[serde(default)]
    pub base_url: Option<String>,
    pub temperature: f32,
    /// Passed through as `reasoning_effort`. `none` disables thinking on models that support it.
    #[serde(default)]
    pub reasoning_effort: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RawAnnotationSettings {
    pub output_directory: PathBuf,
    pub max_dimension: u32,
    pub stroke_width: u32,
    pub font_size: f32,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    pub box_color: [u8; 3],
    pub text_color: [u8; 3],
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SecretSettings {
    /// Bearer token for the model endpoint, e.g. from `gcloud auth print-access-token`.
    #[serde(default)]
    pub access_token: Option<String>,
}
