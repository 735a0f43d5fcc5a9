use crate::{LoggingSettings, RawSettings, SecretSettings, VisionSettings};
use std::path::{PathBuf, absolute};

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub vision: VisionSettings,
    pub annotation: AnnotationSettings,
    pub logging: LoggingSettings,
    pub secrets: SecretSettings,
}

#[derive(Debug, Clone)]
pub struct AnnotationSettings {
    /// Absolute folder the annotated image and detections are written to.
    pub output_directory: PathBuf,
    /// Longest side of the image the model sees and the boxes are drawn on.
    pub max_dimension: u32,
    pub stroke_width: u32,
    pub font_size: f32,
    pub font_path: Option<PathBuf>,
    pub box_color: [u8; 3],
    pub text_color: [u8; 3],
}

impl From<RawSettings> for AppSettings {
    fn from(raw: RawSettings) -> Self {
        let annotation = raw.annotation;
        let output_directory =
            absolute(&annotation.output_directory).unwrap_or(annotation.output_directory);
        let font_path = annotation
            .font_path
            .filter(|path| !path.as_os_str().is_empty());

        Self {
            vision: VisionSettings {
                base_url: raw.vision.base_url.filter(|url| !url.is_empty()),
                reasoning_effort: raw.vision.reasoning_effort.filter(|r| !r.is_empty()),
                ..raw.vision
            },
            annotation: AnnotationSettings {
                output_directory,
                max_dimension: annotation.max_dimension,
                stroke_width: annotation.stroke_width,
                font_size: annotation.font_size,
                font_path,
                box_color: annotation.box_color,
                text_color: annotation.text_color,
            },
            logging: raw.logging,
            secrets: SecretSettings {
                access_token: raw.secrets.access_token.filter(|t| !t.is_empty()),
            },
        }
    }
}
