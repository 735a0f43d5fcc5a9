use crate::{AppSettings, RawSettings};
use color_eyre::eyre::{Result, WrapErr};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.yaml";

pub fn load_app_settings() -> Result<AppSettings> {
    load_app_settings_from(Path::new(DEFAULT_SETTINGS_PATH))
}

/// Load settings from a yaml file, overridden by `APP__SECTION__KEY` environment variables.
pub fn load_app_settings_from(config_path: &Path) -> Result<AppSettings> {
    // Load .env first so its values land in the environment source below.
    dotenv::from_path(".env").ok();
    let config_path = config_path
        .canonicalize()
        .wrap_err_with(|| format!("Cannot find settings file {}", config_path.display()))?;
    debug!("Loading settings from {}", config_path.display());

    let builder = config::Config::builder()
        .add_source(config::File::from(config_path))
        .add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;

    Ok(raw_settings.into())
}
