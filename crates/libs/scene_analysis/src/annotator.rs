use crate::{DetectionSet, PixelBox};
use ab_glyph::{FontArc, PxScale};
use app_state::{AnnotationSettings, to_posix_string};
use color_eyre::eyre::{Result, WrapErr, eyre};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const ANNOTATED_IMAGE_FILE: &str = "annotated_image.png";
pub const DETECTIONS_FILE: &str = "detections.json";

/// Gap between a box and its label.
const LABEL_MARGIN: i32 = 5;
/// Padding around the label text inside its background.
const LABEL_PADDING: u32 = 2;

/// Tried in order when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/Library/Fonts/Arial.ttf",
    "C:/Windows/Fonts/arial.ttf",
];

#[derive(Clone)]
pub struct AnnotatorStyle {
    pub box_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
    pub stroke_width: u32,
    /// Label height in pixels.
    pub font_size: f32,
    /// Without a font labels get their background but no text.
    pub font: Option<FontArc>,
}

impl Default for AnnotatorStyle {
    fn default() -> Self {
        Self {
            box_color: Rgba([255, 0, 0, 255]),
            text_color: Rgba([255, 255, 255, 255]),
            stroke_width: 3,
            font_size: 16.0,
            font: None,
        }
    }
}

impl AnnotatorStyle {
    pub fn with_font_file(mut self, path: &Path) -> Result<Self> {
        self.font = Some(load_font(path)?);
        Ok(self)
    }

    /// Style from settings. Falls back to a system font, then to no font at all.
    #[must_use]
    pub fn from_settings(settings: &AnnotationSettings) -> Self {
        let [r, g, b] = settings.box_color;
        let [tr, tg, tb] = settings.text_color;
        let style = Self {
            box_color: Rgba([r, g, b, 255]),
            text_color: Rgba([tr, tg, tb, 255]),
            stroke_width: settings.stroke_width.max(1),
            font_size: settings.font_size,
            font: None,
        };

        if let Some(path) = &settings.font_path {
            match load_font(path) {
                Ok(font) => {
                    return Self {
                        font: Some(font),
                        ..style
                    };
                }
                Err(err) => warn!("Cannot use configured font: {err:#}"),
            }
        }

        let font = SYSTEM_FONTS
            .iter()
            .map(Path::new)
            .filter(|path| path.is_file())
            .find_map(|path| load_font(path).ok());
        if font.is_none() {
            warn!("No usable font found, labels will be drawn without text");
        }
        Self { font, ..style }
    }
}

fn load_font(path: &Path) -> Result<FontArc> {
    let data = fs::read(path).wrap_err_with(|| format!("Cannot read font {}", path.display()))?;
    FontArc::try_from_vec(data).map_err(|err| eyre!("Invalid font {}: {err}", path.display()))
}

/// A record that made it onto the image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrawnBox {
    /// Position in the detection set.
    pub index: usize,
    pub label: String,
    pub pixels: PixelBox,
}

pub struct RenderedImage {
    pub image: RgbaImage,
    pub drawn: Vec<DrawnBox>,
    /// Indices of degenerate records.
    pub skipped: Vec<usize>,
}

/// Paths of one annotation pass. Rerunning into the same directory overwrites both files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationArtifact {
    pub annotated_image: PathBuf,
    pub detections_json: PathBuf,
    pub drawn: usize,
    pub skipped: usize,
}

#[derive(Clone, Default)]
pub struct BoxAnnotator {
    style: AnnotatorStyle,
}

impl BoxAnnotator {
    #[must_use]
    pub const fn new(style: AnnotatorStyle) -> Self {
        Self { style }
    }

    #[must_use]
    pub const fn style(&self) -> &AnnotatorStyle {
        &self.style
    }

    /// Draw every renderable record on an RGBA copy of `image`.
    ///
    /// Coordinates are relative to `image` as given, so pass the resized image the
    /// model saw. Degenerate records are logged and skipped.
    #[must_use]
    pub fn render(&self, image: &DynamicImage, detections: &DetectionSet) -> RenderedImage {
        let mut canvas = image.to_rgba8();
        let (width, height) = canvas.dimensions();
        let mut drawn = Vec::new();
        let mut skipped = Vec::new();

        for (index, record) in detections.iter().enumerate() {
            let pixels = record.pixel_box(width, height);
            if pixels.is_degenerate() {
                warn!(
                    "Skipping invalid box for {}: {:?}",
                    record.label, record.box_2d
                );
                skipped.push(index);
                continue;
            }

            self.draw_box(&mut canvas, &pixels);
            self.draw_label(&mut canvas, &pixels, &record.label);
            info!(
                "Drew bounding box and label for {} at {:?}",
                record.label,
                pixels.as_array()
            );
            drawn.push(DrawnBox {
                index,
                label: record.label.clone(),
                pixels,
            });
        }

        RenderedImage {
            image: canvas,
            drawn,
            skipped,
        }
    }

    /// Render, then write the annotated image and the full detection list into `output_dir`.
    pub fn annotate(
        &self,
        image: &DynamicImage,
        detections: &DetectionSet,
        output_dir: &Path,
    ) -> Result<AnnotationArtifact> {
        let rendered = self.render(image, detections);

        fs::create_dir_all(output_dir)
            .wrap_err_with(|| format!("Cannot create output folder {}", output_dir.display()))?;

        let annotated_image = output_dir.join(ANNOTATED_IMAGE_FILE);
        rendered
            .image
            .save(&annotated_image)
            .wrap_err_with(|| format!("Cannot write {}", annotated_image.display()))?;
        info!("Saved annotated image to {}", to_posix_string(&annotated_image));

        let detections_json = output_dir.join(DETECTIONS_FILE);
        fs::write(&detections_json, detections.to_pretty_json()?)
            .wrap_err_with(|| format!("Cannot write {}", detections_json.display()))?;
        info!(
            "Saved detection results to {}",
            to_posix_string(&detections_json)
        );

        Ok(AnnotationArtifact {
            annotated_image,
            detections_json,
            drawn: rendered.drawn.len(),
            skipped: rendered.skipped.len(),
        })
    }

    fn draw_box(&self, canvas: &mut RgbaImage, pixels: &PixelBox) {
        let width = pixels.width().unsigned_abs();
        let height = pixels.height().unsigned_abs();
        // Stroke grows inward so the outer edge stays on the box.
        for inset in 0..self.style.stroke_width {
            let (Some(w), Some(h)) = (
                width.checked_sub(2 * inset).filter(|w| *w > 0),
                height.checked_sub(2 * inset).filter(|h| *h > 0),
            ) else {
                break;
            };
            let offset = inset as i32;
            let rect = Rect::at(pixels.x0 + offset, pixels.y0 + offset).of_size(w, h);
            draw_hollow_rect_mut(canvas, rect, self.style.box_color);
        }
    }

    fn draw_label(&self, canvas: &mut RgbaImage, pixels: &PixelBox, label: &str) {
        let (text_width, text_height) = self.label_size(label);
        let above = pixels
            .y0
            .saturating_sub(text_height as i32)
            .saturating_sub(LABEL_MARGIN);
        let label_x = pixels.x0;
        let label_y = if above < 0 {
            pixels.y0.saturating_add(LABEL_MARGIN)
        } else {
            above
        };

        let background = Rect::at(label_x, label_y).of_size(
            text_width + 2 * LABEL_PADDING,
            text_height + 2 * LABEL_PADDING,
        );
        draw_filled_rect_mut(canvas, background, self.style.box_color);

        if let Some(font) = &self.style.font {
            draw_text_mut(
                canvas,
                self.style.text_color,
                label_x + LABEL_PADDING as i32,
                label_y + LABEL_PADDING as i32,
                PxScale::from(self.style.font_size),
                font,
                label,
            );
        }
    }

    /// Measured with the font when there is one, otherwise estimated from the font size.
    fn label_size(&self, label: &str) -> (u32, u32) {
        match &self.style.font {
            Some(font) => text_size(PxScale::from(self.style.font_size), font, label),
            None => {
                let glyph_width = self.style.font_size * 0.6;
                let chars = label.chars().count() as f32;
                (
                    (glyph_width * chars).round() as u32,
                    self.style.font_size.round() as u32,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DetectionRecord;
    use image::{Rgb, RgbImage};

    const BACKGROUND: Rgba<u8> = Rgba([0, 0, 255, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([0, 0, 255])))
    }

    #[test]
    fn test_render_draws_box_outline() {
        let annotator = BoxAnnotator::default();
        let detections = DetectionSet::new(vec![DetectionRecord::new([100, 200, 400, 600], "car")]);

        let rendered = annotator.render(&blank(1000, 1000), &detections);

        assert_eq!(rendered.skipped, Vec::<usize>::new());
        assert_eq!(
            rendered.drawn,
            [DrawnBox {
                index: 0,
                label: "car".to_string(),
                pixels: PixelBox {
                    y0: 100,
                    x0: 200,
                    y1: 400,
                    x1: 600
                },
            }]
        );
        let img = &rendered.image;
        // Corners of the outline.
        assert_eq!(*img.get_pixel(200, 100), RED);
        assert_eq!(*img.get_pixel(599, 399), RED);
        // Edges, three pixels deep.
        assert_eq!(*img.get_pixel(202, 250), RED);
        assert_eq!(*img.get_pixel(400, 397), RED);
        // Just inside the stroke and outside the box.
        assert_eq!(*img.get_pixel(203, 250), BACKGROUND);
        assert_eq!(*img.get_pixel(400, 250), BACKGROUND);
        assert_eq!(*img.get_pixel(199, 250), BACKGROUND);
        assert_eq!(*img.get_pixel(600, 250), BACKGROUND);
    }

    #[test]
    fn test_label_sits_above_box() {
        let annotator = BoxAnnotator::default();
        let detections = DetectionSet::new(vec![DetectionRecord::new([100, 200, 400, 600], "car")]);

        let img = annotator.render(&blank(1000, 1000), &detections).image;

        // 16px estimated text height puts the background top at y 79.
        assert_eq!(*img.get_pixel(201, 80), RED);
        assert_eq!(*img.get_pixel(201, 78), BACKGROUND);
    }

    #[test]
    fn test_label_moves_below_top_edge() {
        let annotator = BoxAnnotator::default();
        let detections = DetectionSet::new(vec![DetectionRecord::new([0, 0, 500, 500], "sky")]);

        let img = annotator.render(&blank(100, 100), &detections).image;

        // Background starts 5px below the top of the box, inside it.
        assert_eq!(*img.get_pixel(10, 10), RED);
        assert_eq!(*img.get_pixel(10, 30), BACKGROUND);
    }

    #[test]
    fn test_degenerate_record_is_skipped() {
        let annotator = BoxAnnotator::default();
        let detections = DetectionSet::new(vec![
            DetectionRecord::new([500, 100, 500, 900], "flat"),
            DetectionRecord::new([100, 100, 200, 200], "ok"),
        ]);

        let rendered = annotator.render(&blank(1000, 1000), &detections);

        assert_eq!(rendered.skipped, [0]);
        assert_eq!(rendered.drawn.len(), 1);
        assert_eq!(rendered.drawn[0].label, "ok");
        // Nothing drawn along the flat box's row.
        assert_eq!(*rendered.image.get_pixel(500, 500), BACKGROUND);
    }

    #[test]
    fn test_extreme_coordinates_are_clipped_to_the_image() -> Result<()> {
        let annotator = BoxAnnotator::default();
        let detections = DetectionSet::from_json(
            r#"[
                {"box_2d": [-2147483648, 0, 1000, 1000], "label": "x"},
                {"box_2d": [-50, -50, 1100, 1100], "label": "overflowing"}
            ]"#,
        )?;

        let rendered = annotator.render(&blank(1024, 1024), &detections);

        assert_eq!(rendered.drawn.len(), 2);
        assert_eq!(rendered.drawn[0].pixels.as_array(), [0, 0, 1024, 1024]);
        assert_eq!(rendered.drawn[1].pixels.as_array(), [0, 0, 1024, 1024]);
        assert_eq!(*rendered.image.get_pixel(1023, 1023), RED);
        Ok(())
    }

    #[test]
    fn test_render_leaves_source_untouched() {
        let annotator = BoxAnnotator::default();
        let source = blank(50, 50);
        let detections = DetectionSet::new(vec![DetectionRecord::new([0, 0, 1000, 1000], "all")]);

        let rendered = annotator.render(&source, &detections);

        assert_eq!(*rendered.image.get_pixel(0, 0), RED);
        assert_eq!(source.to_rgba8().get_pixel(0, 0), &BACKGROUND);
    }

    #[test]
    fn test_thin_box_does_not_panic() {
        let annotator = BoxAnnotator::default();
        let detections = DetectionSet::new(vec![DetectionRecord::new([0, 0, 10, 1000], "line")]);

        let rendered = annotator.render(&blank(100, 100), &detections);

        assert_eq!(rendered.drawn.len(), 1);
        assert_eq!(*rendered.image.get_pixel(50, 0), RED);
    }

    #[test]
    fn test_annotate_writes_artifacts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output_dir = dir.path().join("nested/outputs");
        let annotator = BoxAnnotator::default();
        let detections = DetectionSet::new(vec![
            DetectionRecord::new([100, 200, 400, 600], "car"),
            DetectionRecord::new([300, 300, 300, 400], "flat"),
        ]);

        let artifact = annotator.annotate(&blank(1000, 1000), &detections, &output_dir)?;

        assert_eq!(artifact.drawn, 1);
        assert_eq!(artifact.skipped, 1);
        assert_eq!(artifact.annotated_image, output_dir.join(ANNOTATED_IMAGE_FILE));
        let written = image::open(&artifact.annotated_image)?.to_rgba8();
        assert_eq!(written.dimensions(), (1000, 1000));
        assert_eq!(*written.get_pixel(200, 100), RED);

        let persisted = DetectionSet::from_json(&fs::read_to_string(&artifact.detections_json)?)?;
        assert_eq!(persisted, detections);
        Ok(())
    }

    #[test]
    fn test_annotate_overwrites_previous_run() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let annotator = BoxAnnotator::default();
        let first = DetectionSet::new(vec![DetectionRecord::new([1, 1, 2, 2], "first")]);
        let second = DetectionSet::new(vec![DetectionRecord::new([3, 3, 4, 4], "second")]);

        annotator.annotate(&blank(10, 10), &first, dir.path())?;
        let artifact = annotator.annotate(&blank(10, 10), &second, dir.path())?;

        let persisted = DetectionSet::from_json(&fs::read_to_string(artifact.detections_json)?)?;
        assert_eq!(persisted, second);
        Ok(())
    }

    #[test]
    fn test_missing_font_file_is_an_error() {
        let style = AnnotatorStyle::default().with_font_file(Path::new("no/such/font.ttf"));
        assert!(style.is_err());
    }

    #[test]
    fn test_style_from_settings() {
        let settings = AnnotationSettings {
            output_directory: PathBuf::from("out"),
            max_dimension: 1024,
            stroke_width: 0,
            font_size: 20.0,
            font_path: Some(PathBuf::from("no/such/font.ttf")),
            box_color: [0, 255, 0],
            text_color: [0, 0, 0],
        };

        let style = AnnotatorStyle::from_settings(&settings);

        assert_eq!(style.box_color, Rgba([0, 255, 0, 255]));
        assert_eq!(style.text_color, Rgba([0, 0, 0, 255]));
        assert_eq!(style.stroke_width, 1);
        assert!((style.font_size - 20.0).abs() < f32::EPSILON);
    }
}
