//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// hiddeck - drive Elgato Stream Deck panels over raw hidraw.
///
/// Robot Mode: Use --robot or --format=json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "hiddeck", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "HIDDECK_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output (NO_COLOR accepts any non-falsey value)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Target device by serial number (required if multiple devices connected)
    #[arg(long, short = 's', global = true, env = "HIDDECK_SERIAL")]
    pub serial: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// Pretty JSON
    Json,
    /// Single-line JSON
    JsonCompact,
}

impl Cli {
    /// True for robot mode or an explicit JSON format.
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List connected devices
    List(ListArgs),

    /// Show geometry and firmware of the selected device
    Info,

    /// Set panel brightness (values above 100 are clamped)
    Brightness(BrightnessArgs),

    /// Show an image on a key, optionally with a text label
    SetKey(SetKeyArgs),

    /// Fill a key with a solid color
    FillKey(FillKeyArgs),

    /// Black out every key
    ClearAll,

    /// Reset the panel to its splash screen
    Reset,

    /// Stream key press/release events
    Watch(WatchArgs),

    /// Show version and build information
    Version,
}

#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Include sysfs path and capability details
    #[arg(long, short = 'l')]
    pub long: bool,
}

#[derive(Parser, Debug)]
pub struct BrightnessArgs {
    /// Brightness percentage
    pub level: u8,
}

#[derive(Parser, Debug)]
pub struct SetKeyArgs {
    /// Key index (0-based, left-to-right, top-to-bottom)
    pub key: u8,

    /// Path to image file (PNG, JPEG, BMP, GIF)
    pub image: PathBuf,

    /// Text drawn over the image
    #[arg(long)]
    pub label: Option<String>,

    /// Font file for the label
    #[arg(long, requires = "label")]
    pub font: Option<PathBuf>,

    /// Label size in points
    #[arg(long, requires = "label")]
    pub font_size: Option<f32>,

    /// Label color in hex (RRGGBB or RRGGBBAA), white if unset
    #[arg(long, requires = "label")]
    pub color: Option<String>,
}

#[derive(Parser, Debug)]
pub struct FillKeyArgs {
    /// Key index
    pub key: u8,

    /// Color in hex format (e.g., "ff0000" for red, "#00ff00" for green)
    pub color: String,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Exit after the first event
    #[arg(long)]
    pub once: bool,

    /// Timeout in seconds (0 = no timeout)
    #[arg(long, short = 't', default_value = "0")]
    pub timeout: u64,
}
