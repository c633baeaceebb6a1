#![windows_subsystem = "windows"]

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use wave_portal::{config::Config, gui, user_settings::UserSettings};

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Environment first, then saved settings on top
    let mut config = Config::from_env()?;
    UserSettings::load().apply_to(&mut config)?;
    gui::launch(config)?;

    Ok(())
}
