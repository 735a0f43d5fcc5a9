use crate::utils::{load_image, to_inline_png};
use crate::{DetectionOutcome, ObjectDetector};
use app_state::AppSettings;
use color_eyre::eyre::Result;
use language_model::{VisionClient, VisionModel, vertex_base_url};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

const SCENE_PROMPT: &str = "You are an expert image analyst. Describe this image in detail: \
the main objects and their properties, the spatial relationships between them, the scene \
context and setting, colors, textures and any notable features or anomalies. Be thorough \
but only describe what is visible.";

const LOCATION_PROMPT: &str = "You are an expert at identifying where a photo was taken. \
Using the image and the analysis below, deduce the country, city and specific location. \
Explain your reasoning: which landmarks, objects, text or languages narrow it down. End \
with your best guess as a Google Maps search link.";

/// What a scene analysis needs to know about its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub project: String,
    pub region: String,
    pub output_directory: PathBuf,
}

impl AnalysisConfig {
    /// Chat endpoint of the model for this project and region.
    #[must_use]
    pub fn endpoint(&self) -> String {
        vertex_base_url(&self.project, &self.region)
    }
}

impl From<&AppSettings> for AnalysisConfig {
    fn from(settings: &AppSettings) -> Self {
        Self {
            project: settings.vision.project.clone(),
            region: settings.vision.region.clone(),
            output_directory: settings.annotation.output_directory.clone(),
        }
    }
}

/// Client for the configured model; `vision.base_url` wins over the project endpoint.
#[must_use]
pub fn vision_client(settings: &AppSettings) -> VisionClient {
    let base_url = settings
        .vision
        .base_url
        .clone()
        .unwrap_or_else(|| AnalysisConfig::from(settings).endpoint());
    VisionClient::with_base_url(&base_url)
        .model(settings.vision.model.clone())
        .maybe_access_token(settings.secrets.access_token.clone())
        .temperature(settings.vision.temperature)
        .maybe_reasoning_effort(settings.vision.reasoning_effort.clone())
        .build()
}

#[derive(Debug, Clone)]
pub struct SceneReport {
    pub detections: DetectionOutcome,
    pub description: String,
    pub location: String,
}

#[derive(Serialize)]
struct SceneSummary<'a> {
    description: &'a str,
    location: &'a str,
    detections: Option<&'a str>,
}

impl SceneReport {
    /// Description, location and the raw detection JSON (if it parsed) as pretty JSON.
    pub fn to_pretty_json(&self) -> Result<String> {
        let summary = SceneSummary {
            description: &self.description,
            location: &self.location,
            detections: self
                .detections
                .artifact()
                .map(|_| self.detections.raw_json()),
        };
        Ok(serde_json::to_string_pretty(&summary)?)
    }
}

/// Detects objects, describes the scene, then guesses where it is.
pub struct SceneAnalyst<M> {
    detector: ObjectDetector<M>,
    config: AnalysisConfig,
}

impl<M: VisionModel> SceneAnalyst<M> {
    #[must_use]
    pub const fn new(detector: ObjectDetector<M>, config: AnalysisConfig) -> Self {
        Self { detector, config }
    }

    #[must_use]
    pub const fn detector(&self) -> &ObjectDetector<M> {
        &self.detector
    }

    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub async fn analyze(&self, image_path: &Path) -> Result<SceneReport> {
        let image = load_image(image_path, self.detector.max_dimension())?;
        let detections = self
            .detector
            .detect_in_image(&image, &self.config.output_directory)
            .await?;

        let model = self.detector.model();
        let inline = to_inline_png(&image)?;

        info!("Describing scene with {}", model.model_name());
        let description = model
            .generate(&scene_prompt(&detections), std::slice::from_ref(&inline))
            .await?;

        info!("Locating scene with {}", model.model_name());
        let location = model
            .generate(&location_prompt(&description), &[inline])
            .await?;

        Ok(SceneReport {
            detections,
            description,
            location,
        })
    }
}

fn scene_prompt(detections: &DetectionOutcome) -> String {
    match detections {
        DetectionOutcome::Annotated { raw_json, .. } => format!(
            "{SCENE_PROMPT}\n\nObjects were detected at these bounding boxes \
            ([ymin, xmin, ymax, xmax], normalized to 0-1000):\n{raw_json}"
        ),
        DetectionOutcome::Rejected { .. } => SCENE_PROMPT.to_string(),
    }
}

fn location_prompt(description: &str) -> String {
    format!("{LOCATION_PROMPT}\n\nImage analysis:\n{description}")
}
