#![allow(clippy::missing_errors_doc)]

use color_eyre::eyre::{Result, eyre};
use language_model::{InlineImage, VisionClient, VisionModel, vertex_base_url};
use std::path::Path;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

pub async fn run() -> Result<()> {
    let project = std::env::var("APP__VISION__PROJECT")?;
    let region = std::env::var("APP__VISION__REGION").unwrap_or_else(|_| "global".to_string());
    let token = std::env::var("APP__SECRETS__ACCESS_TOKEN")
        .map_err(|_| eyre!("Set APP__SECRETS__ACCESS_TOKEN to `gcloud auth print-access-token`"))?;

    let client = VisionClient::with_base_url(&vertex_base_url(&project, &region))
        .model("google/gemini-2.5-flash".to_string())
        .access_token(token)
        .reasoning_effort("none".to_string())
        .build();

    let image = InlineImage::from_path(Path::new("assets/street.jpg")).await?;
    let prompt = "Caption this image in one paragraph. Respond with the caption only.";

    let now = Instant::now();
    info!(
        "Caption: {}",
        client.chat(prompt).images(&[image.clone()]).call().await?
    );
    info!(
        "Where: {}",
        client
            .generate("In which country was this photo most likely taken?", &[image])
            .await?
    );
    info!("Total time for [{}]: {:?}", client.model_name(), now.elapsed());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();
    color_eyre::install()?;

    run().await?;

    Ok(())
}
