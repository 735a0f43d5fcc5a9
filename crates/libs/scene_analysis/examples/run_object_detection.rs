use app_state::load_app_settings;
use color_eyre::eyre::Result;
use scene_analysis::{AnnotatorStyle, BoxAnnotator, ObjectDetector, vision_client};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    let settings = load_app_settings()?;
    let annotator = BoxAnnotator::new(AnnotatorStyle::from_settings(&settings.annotation));
    let detector = ObjectDetector::new(vision_client(&settings), annotator);

    let images = vec![Path::new("assets/street.jpg"), Path::new("assets/harbour.jpg")];

    for image in images {
        let now = Instant::now();
        let output_dir = settings
            .annotation
            .output_directory
            .join(image.file_stem().unwrap_or_default());
        let outcome = detector.detect(image, &output_dir).await?;
        match outcome.detections() {
            Some(detections) => println!(
                "{}: {} objects, saved to {}",
                image.display(),
                detections.len(),
                output_dir.display()
            ),
            None => eprintln!("{}: no usable detections", image.display()),
        }
        println!("\tdetect {:?}", now.elapsed());
    }

    Ok(())
}
