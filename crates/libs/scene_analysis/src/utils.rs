use color_eyre::eyre::{Result, WrapErr};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use language_model::InlineImage;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Longest side of the image sent to the model and drawn on.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Decode an image (format guessed from its content) and shrink it to fit `max_dimension`.
pub fn load_image(path: &Path, max_dimension: u32) -> Result<DynamicImage> {
    let img = ImageReader::open(path)
        .wrap_err_with(|| format!("Cannot open image {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .wrap_err_with(|| format!("Cannot decode image {}", path.display()))?;
    Ok(shrink_to_fit(img, max_dimension))
}

/// Downscale preserving aspect ratio so neither side exceeds `max_dimension`. Never upscales.
#[must_use]
pub fn shrink_to_fit(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (w, h) = img.dimensions();
    if w <= max_dimension && h <= max_dimension {
        return img;
    }
    let resized = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    debug!(
        "Resized {w}x{h} to {}x{}",
        resized.width(),
        resized.height()
    );
    resized
}

/// PNG-encode an image for a model request.
pub fn to_inline_png(img: &DynamicImage) -> Result<InlineImage> {
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(InlineImage {
        mime_type: "image/png".to_string(),
        data: bytes.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use rstest::rstest;

    #[rstest]
    #[case(2048, 1024, 1024, 512)]
    #[case(1000, 3000, 341, 1024)]
    #[case(1025, 1025, 1024, 1024)]
    #[case(1000, 1000, 1000, 1000)]
    #[case(300, 200, 300, 200)]
    fn test_shrink_to_fit(
        #[case] width: u32,
        #[case] height: u32,
        #[case] expected_width: u32,
        #[case] expected_height: u32,
    ) {
        let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
        let resized = shrink_to_fit(img, DEFAULT_MAX_DIMENSION);
        assert_eq!(resized.dimensions(), (expected_width, expected_height));
    }

    #[test]
    fn test_load_image_guesses_format_and_resizes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        // Wrong extension on purpose, the content decides the format.
        let path = dir.path().join("photo.jpg");
        RgbImage::from_pixel(1600, 800, Rgb([10, 20, 30])).save_with_format(&path, ImageFormat::Png)?;

        let img = load_image(&path, DEFAULT_MAX_DIMENSION)?;
        assert_eq!(img.dimensions(), (1024, 512));
        Ok(())
    }

    #[test]
    fn test_missing_image_is_an_error() {
        assert!(load_image(Path::new("no/such/image.png"), DEFAULT_MAX_DIMENSION).is_err());
    }

    #[test]
    fn test_inline_png_decodes_back() -> Result<()> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 3, Rgb([1, 2, 3])));
        let inline = to_inline_png(&img)?;
        assert_eq!(inline.mime_type, "image/png");
        let decoded = image::load_from_memory(&inline.data)?;
        assert_eq!(decoded.dimensions(), (4, 3));
        Ok(())
    }
}
