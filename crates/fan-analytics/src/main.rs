mod bootstrap;
mod commands;

use anyhow::Result;
use fan_core::settings::{LastUsedFilters, Settings};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Fan Analytics v{} starting", env!("CARGO_PKG_VERSION"));

    let data_path = settings.data_file_path();
    tracing::info!("Record file: {}", data_path.display());

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(
        &settings.command,
        &data_path,
        &LastUsedFilters::config_path(),
        &mut out,
    )
}
