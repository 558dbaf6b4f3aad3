use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use mcp_config_lib::{Database, McpRegistry, Settings};

mod tui;

use tui::theme::{Palette, ThemeProvider};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting MCP Config TUI v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load();

    let db = match Database::init() {
        Ok(db) => Arc::new(db),
        Err(e) => {
            log::error!("Failed to open server database: {e}");
            return Err(e.into());
        }
    };

    let registry = Arc::new(McpRegistry::new(
        db,
        Duration::from_secs(settings.request_timeout_secs),
    )?);

    let palette = Palette::by_name(&settings.theme).unwrap_or_else(|| {
        log::warn!("🎨 Unknown theme {:?}, falling back to dark", settings.theme);
        Palette::dark()
    });
    let themes = ThemeProvider::new(palette);

    tui::run(registry, themes, settings).await
}
