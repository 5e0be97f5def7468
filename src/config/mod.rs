//! Embedder configuration.
//!
//! Configuration comes from two layers: command-line flags and an
//! optional JSON override file (`--config`). The JSON file supplies
//! defaults; any flag given on the command line wins over it. None of
//! these values are interpreted by the core; they are resolved here
//! once and handed to [`App`](crate::core::app::App) fully merged.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tracing::info;

use crate::core::window::WindowType;

pub const DEFAULT_WIDTH: u32 = 1920;
pub const DEFAULT_HEIGHT: u32 = 1080;
pub const DEFAULT_APP_ID: &str = "tanoak";

/// Command-line surface. No flag is interpreted by the core itself.
#[derive(Parser, Debug, Default)]
#[command(name = "tanoak", about = "Wayland embedder for an externally-hosted UI runtime")]
pub struct CliArgs {
    /// Application bundle directory
    #[arg(short, long)]
    pub bundle: Option<PathBuf>,

    /// Initial window width in logical pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Initial window height in logical pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Start fullscreen on the primary output
    #[arg(short, long)]
    pub fullscreen: bool,

    /// Window role: NORMAL, BG, PANEL_TOP, PANEL_BOTTOM, PANEL_LEFT, PANEL_RIGHT
    #[arg(long)]
    pub window_type: Option<String>,

    /// Application id advertised to the compositor
    #[arg(long)]
    pub app_id: Option<String>,

    /// Cursor theme name; omit to use the system default theme
    #[arg(long)]
    pub cursor_theme: Option<String>,

    /// Accessibility feature bitmask forwarded to the runtime
    #[arg(long)]
    pub accessibility: Option<i64>,

    /// JSON configuration override path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// JSON override file shape. Every field optional; CLI flags win.
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bundle: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    fullscreen: Option<bool>,
    window_type: Option<String>,
    app_id: Option<String>,
    cursor_theme: Option<String>,
    accessibility: Option<i64>,
}

/// Fully merged embedder configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bundle: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub window_type: WindowType,
    pub app_id: String,
    pub cursor_theme: Option<String>,
    pub accessibility_features: i64,
}

impl Config {
    /// Merge CLI flags over the optional JSON override file.
    pub fn load(cli: CliArgs) -> anyhow::Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                let parsed: FileConfig = serde_json::from_str(&text)
                    .with_context(|| format!("parsing config file {}", path.display()))?;
                info!("config override: {}", path.display());
                parsed
            }
            None => FileConfig::default(),
        };

        let bundle = cli
            .bundle
            .or(file.bundle)
            .context("no bundle directory given (--bundle or config file)")?;

        let window_type = cli
            .window_type
            .or(file.window_type)
            .map(|s| WindowType::parse(&s))
            .unwrap_or(WindowType::Normal);

        Ok(Self {
            bundle,
            width: cli.width.or(file.width).unwrap_or(DEFAULT_WIDTH),
            height: cli.height.or(file.height).unwrap_or(DEFAULT_HEIGHT),
            fullscreen: cli.fullscreen || file.fullscreen.unwrap_or(false),
            window_type,
            app_id: cli.app_id.or(file.app_id).unwrap_or_else(|| DEFAULT_APP_ID.to_string()),
            cursor_theme: cli.cursor_theme.or(file.cursor_theme),
            accessibility_features: cli.accessibility.or(file.accessibility).unwrap_or(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_with_bundle() -> CliArgs {
        CliArgs { bundle: Some(PathBuf::from("/opt/app")), ..Default::default() }
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let config = Config::load(cli_with_bundle()).unwrap();
        assert_eq!(config.width, DEFAULT_WIDTH);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.window_type, WindowType::Normal);
        assert!(!config.fullscreen);
        assert_eq!(config.app_id, DEFAULT_APP_ID);
    }

    #[test]
    fn cli_wins_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bundle": "/from/file", "width": 640, "app_id": "file-app"}}"#).unwrap();

        let cli = CliArgs {
            bundle: Some(PathBuf::from("/from/cli")),
            width: Some(800),
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = Config::load(cli).unwrap();
        assert_eq!(config.bundle, PathBuf::from("/from/cli"));
        assert_eq!(config.width, 800);
        // untouched by CLI, taken from the file
        assert_eq!(config.app_id, "file-app");
    }

    #[test]
    fn missing_bundle_is_an_error() {
        assert!(Config::load(CliArgs::default()).is_err());
    }

    #[test]
    fn window_type_parsing() {
        let cli = CliArgs {
            window_type: Some("PANEL_BOTTOM".into()),
            ..cli_with_bundle()
        };
        assert_eq!(Config::load(cli).unwrap().window_type, WindowType::PanelBottom);
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"bundle": "/x", "no_such_key": 1}}"#).unwrap();
        let cli = CliArgs { config: Some(file.path().to_path_buf()), ..Default::default() };
        assert!(Config::load(cli).is_err());
    }
}
