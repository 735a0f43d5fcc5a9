use crate::utils::{DEFAULT_MAX_DIMENSION, load_image, to_inline_png};
use crate::{AnnotationArtifact, BoxAnnotator, DetectionSet, find_json};
use color_eyre::eyre::Result;
use image::DynamicImage;
use language_model::VisionModel;
use std::path::Path;
use tracing::{error, info, warn};

const OBJECT_DETECTION_PROMPT: &str = "Identify the objects in this image. Output a JSON list \
where each entry contains the 2D bounding box in the key \"box_2d\" and the text label in the \
key \"label\". The box is [ymin, xmin, ymax, xmax] with integer coordinates normalized to \
0-1000. Use descriptive labels for the identified objects.";

/// How much of a rejected candidate ends up in the log.
const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub enum DetectionOutcome {
    /// Boxes were drawn and both files written.
    Annotated {
        /// JSON text extracted from the model response, before deserializing.
        raw_json: String,
        detections: DetectionSet,
        artifact: AnnotationArtifact,
    },
    /// The response held nothing that deserializes into detections. No files were written.
    Rejected { raw_json: String, reason: String },
}

impl DetectionOutcome {
    #[must_use]
    pub fn raw_json(&self) -> &str {
        match self {
            Self::Annotated { raw_json, .. } | Self::Rejected { raw_json, .. } => raw_json,
        }
    }

    #[must_use]
    pub const fn artifact(&self) -> Option<&AnnotationArtifact> {
        match self {
            Self::Annotated { artifact, .. } => Some(artifact),
            Self::Rejected { .. } => None,
        }
    }

    #[must_use]
    pub const fn detections(&self) -> Option<&DetectionSet> {
        match self {
            Self::Annotated { detections, .. } => Some(detections),
            Self::Rejected { .. } => None,
        }
    }
}

/// Asks a vision model for bounding boxes and draws them.
pub struct ObjectDetector<M> {
    model: M,
    annotator: BoxAnnotator,
    max_dimension: u32,
}

impl<M: VisionModel> ObjectDetector<M> {
    #[must_use]
    pub const fn new(model: M, annotator: BoxAnnotator) -> Self {
        Self {
            model,
            annotator,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    #[must_use]
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub const fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Load and shrink the image at `image_path`, then detect and annotate.
    pub async fn detect(&self, image_path: &Path, output_dir: &Path) -> Result<DetectionOutcome> {
        let image = load_image(image_path, self.max_dimension)?;
        self.detect_in_image(&image, output_dir).await
    }

    /// Detect on an already resized image; box coordinates are relative to it.
    pub async fn detect_in_image(
        &self,
        image: &DynamicImage,
        output_dir: &Path,
    ) -> Result<DetectionOutcome> {
        let inline = to_inline_png(image)?;
        let response = self
            .model
            .generate(OBJECT_DETECTION_PROMPT, &[inline])
            .await?;

        let candidate = find_json(&response);
        let raw_json = candidate.as_str().to_string();
        if !candidate.is_found() {
            warn!("No JSON found in the model response");
        }
        info!("Parsed JSON:\n{raw_json}");

        let detections = match DetectionSet::from_json(&raw_json) {
            Ok(detections) => detections,
            Err(err) => {
                let excerpt: String = raw_json.chars().take(EXCERPT_CHARS).collect();
                error!("JSON parsing error: {err}");
                error!("Attempted to parse: {excerpt}...");
                return Ok(DetectionOutcome::Rejected {
                    raw_json,
                    reason: err.to_string(),
                });
            }
        };
        info!("Successfully parsed JSON with {} items", detections.len());

        let artifact = self.annotator.annotate(image, &detections, output_dir)?;

        Ok(DetectionOutcome::Annotated {
            raw_json,
            detections,
            artifact,
        })
    }
}
