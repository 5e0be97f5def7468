use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use tanoak::config::{CliArgs, Config};
use tanoak::core::backend::HeadlessBackend;
use tanoak::core::channels::BindingRegistry;
use tanoak::core::App;

fn main() -> Result<()> {
    // Initialize logging
    // Set default log level to info
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,tanoak=debug");
    }
    tracing_subscriber::fmt()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_ansi(false)
        .init();

    let config = Config::load(CliArgs::parse())?;
    tracing::info!("starting with bundle {}", config.bundle.display());

    let backend = Arc::new(HeadlessBackend::new());
    let registry = Arc::new(BindingRegistry::new());

    let mut app = App::new(config, backend, registry)?;
    app.create_window()?;
    app.run()?;

    Ok(())
}
