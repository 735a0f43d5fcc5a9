use app_state::{AppSettings, DEFAULT_SETTINGS_PATH, load_app_settings_from};
use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::eyre;
use language_model::VisionClient;
use scene_analysis::{
    AnalysisConfig, AnnotatorStyle, BoxAnnotator, DetectionOutcome, ObjectDetector, SceneAnalyst,
    vision_client,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file, overridden by `APP__SECTION__KEY` environment variables.
    #[clap(long, short, default_value = DEFAULT_SETTINGS_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Draw the objects a vision model finds in an image.
    Detect {
        image: PathBuf,
        /// Defaults to `annotation.output_directory`.
        #[clap(long, short)]
        output_dir: Option<PathBuf>,
    },
    /// Detect objects, describe the scene and guess where it was taken.
    Analyze { image: PathBuf },
}

fn detector(settings: &AppSettings) -> ObjectDetector<VisionClient> {
    let annotator = BoxAnnotator::new(AnnotatorStyle::from_settings(&settings.annotation));
    ObjectDetector::new(vision_client(settings), annotator)
        .with_max_dimension(settings.annotation.max_dimension)
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let settings = load_app_settings_from(&args.config)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match args.command {
        Command::Detect { image, output_dir } => {
            let output_dir =
                output_dir.unwrap_or_else(|| settings.annotation.output_directory.clone());
            let outcome = detector(&settings).detect(&image, &output_dir).await?;
            match outcome {
                DetectionOutcome::Annotated {
                    raw_json, artifact, ..
                } => {
                    info!(
                        "Annotated image saved to {}",
                        artifact.annotated_image.display()
                    );
                    println!("{raw_json}");
                }
                DetectionOutcome::Rejected { raw_json, reason } => {
                    println!("{raw_json}");
                    return Err(eyre!("Model response is not a detection list: {reason}"));
                }
            }
        }
        Command::Analyze { image } => {
            let analyst = SceneAnalyst::new(detector(&settings), AnalysisConfig::from(&settings));
            let report = analyst.analyze(&image).await?;
            println!("{}", report.to_pretty_json()?);
        }
    }

    Ok(())
}
