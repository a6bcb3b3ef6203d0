//! hiddeck - operator CLI for Stream Deck panels on raw hidraw.
//!
//! Text output for humans, JSON (robot mode) for scripts.

use std::io::{self, IsTerminal};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use clap::Parser;
use console::style;
use serde::Serialize;

use hiddeck::cli::{self, Cli, Commands};
use hiddeck::device::{self, DeviceInfo, DeviceSession, KeyEvent, VariantRegistry};
use hiddeck::error::{DeckError, Result};
use hiddeck::text::{self, TextStyle};
use hiddeck::{image_ops, logging};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> bool {
        option_env!("VERGEN_GIT_DIRTY") == Some("true")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::List(args) => cmd_list(cli, args),
        Commands::Info => cmd_info(cli),
        Commands::Brightness(args) => cmd_brightness(cli, args),
        Commands::SetKey(args) => cmd_set_key(cli, args),
        Commands::FillKey(args) => cmd_fill_key(cli, args),
        Commands::ClearAll => cmd_clear_all(cli),
        Commands::Reset => cmd_reset(cli),
        Commands::Watch(args) => cmd_watch(cli, args),
        Commands::Version => cmd_version(cli),
    }
}

fn open_selected(cli: &Cli) -> Result<DeviceSession> {
    let devices = device::find_devices(&VariantRegistry::builtin())?;
    let info = device::select_device(devices, cli.serial.as_deref())?;
    DeviceSession::open(&info)
}

fn check_key(session: &DeviceSession, key: u8) -> Result<()> {
    let count = session.variant().key_count;
    if key >= count {
        return Err(DeckError::InvalidKeyIndex { key, max: count - 1 });
    }
    Ok(())
}

/// Report success: JSON in robot mode, a one-line message otherwise.
fn done(cli: &Cli, json: &serde_json::Value, message: &str) {
    if cli.use_json() {
        output_json(cli, json);
    } else if !cli.quiet {
        println!("{message}");
    }
}

// === Command Implementations ===

fn cmd_list(cli: &Cli, args: &cli::ListArgs) -> Result<()> {
    let devices = device::find_devices(&VariantRegistry::builtin())?;

    if cli.use_json() {
        output_json(cli, &devices);
    } else if devices.is_empty() {
        println!("{}", style("No Stream Deck devices found").yellow());
        println!("Ensure the device is connected via USB");
    } else {
        for d in &devices {
            print_device_line(d, args.long);
        }
    }
    Ok(())
}

fn print_device_line(d: &DeviceInfo, long: bool) {
    if long {
        println!(
            "{}: {} on {} ({} keys, {}x{} px, {})",
            style(d.display_id()).green(),
            d.variant.name,
            d.node_path.display(),
            d.variant.key_count,
            d.variant.pixels,
            d.variant.pixels,
            d.sysfs_path.display(),
        );
    } else {
        println!("{} {}", d.display_id(), d.variant.name);
    }
}

#[derive(Serialize)]
struct InfoReport<'a> {
    #[serde(flatten)]
    device: &'a DeviceInfo,
    firmware_version: String,
}

fn cmd_info(cli: &Cli) -> Result<()> {
    let session = open_selected(cli)?;
    let firmware_version = session.firmware_version_string()?;
    let report = InfoReport {
        device: session.info(),
        firmware_version,
    };

    if cli.use_json() {
        output_json(cli, &report);
    } else {
        let v = session.variant();
        println!("{}: {}", style("Model").bold(), v.name);
        println!("{}: {}", style("Serial").bold(), report.device.display_id());
        println!("{}: {}", style("Node").bold(), session.node_path().display());
        println!("{}: {}", style("Firmware").bold(), report.firmware_version);
        println!("{}: {}", style("Keys").bold(), v.key_count);
        println!("{}: {}x{} px", style("Key Size").bold(), v.pixels, v.pixels);
        println!("{}: {} cols x {} rows", style("Layout").bold(), v.columns, v.rows);
    }
    Ok(())
}

fn cmd_brightness(cli: &Cli, args: &cli::BrightnessArgs) -> Result<()> {
    let session = open_selected(cli)?;
    session.set_brightness(args.level)?;

    let level = device::clamp_brightness(args.level);
    done(
        cli,
        &serde_json::json!({ "brightness": level, "ok": true }),
        &format!("Brightness set to {level}%"),
    );
    Ok(())
}

fn cmd_set_key(cli: &Cli, args: &cli::SetKeyArgs) -> Result<()> {
    let session = open_selected(cli)?;
    check_key(&session, args.key)?;

    let mut img = image_ops::load_image(&args.image)?;
    if let Some(label) = &args.label {
        let mut text_style = TextStyle {
            font_path: args.font.clone(),
            size: args.font_size,
            ..TextStyle::default()
        };
        if let Some(color) = &args.color {
            text_style.color = text::parse_color(color)?;
        }
        img = session.compose_text(&img, label, &text_style)?;
    }
    session.set_image(args.key, &img)?;

    done(
        cli,
        &serde_json::json!({
            "key": args.key,
            "image": args.image.display().to_string(),
            "label": args.label,
            "ok": true
        }),
        &format!("Key {} updated", args.key),
    );
    Ok(())
}

fn cmd_fill_key(cli: &Cli, args: &cli::FillKeyArgs) -> Result<()> {
    let color = text::parse_color(&args.color)?;
    let session = open_selected(cli)?;
    check_key(&session, args.key)?;

    let [r, g, b, _] = color.0;
    session.fill_color(args.key, image::Rgb([r, g, b]))?;

    done(
        cli,
        &serde_json::json!({ "key": args.key, "color": format!("{r:02x}{g:02x}{b:02x}"), "ok": true }),
        &format!("Key {} filled", args.key),
    );
    Ok(())
}

fn cmd_clear_all(cli: &Cli) -> Result<()> {
    let session = open_selected(cli)?;
    session.clear()?;
    done(cli, &serde_json::json!({ "cleared": "all", "ok": true }), "All keys cleared");
    Ok(())
}

fn cmd_reset(cli: &Cli) -> Result<()> {
    let session = open_selected(cli)?;
    session.reset()?;
    done(cli, &serde_json::json!({ "reset": true, "ok": true }), "Device reset");
    Ok(())
}

#[derive(Serialize)]
struct WatchEvent {
    #[serde(flatten)]
    event: KeyEvent,
    timestamp_ms: u128,
}

fn cmd_watch(cli: &Cli, args: &cli::WatchArgs) -> Result<()> {
    let session = open_selected(cli)?;
    let events = session.start_scanning()?;

    if !cli.quiet && !cli.use_json() {
        println!("Watching for key events (Ctrl+C to stop)...");
    }

    let deadline = (args.timeout > 0).then(|| Instant::now() + Duration::from_secs(args.timeout));
    loop {
        let wait = match deadline {
            Some(d) => match d.checked_duration_since(Instant::now()) {
                Some(left) => left,
                None => break,
            },
            None => Duration::from_secs(3600),
        };

        let event = match events.recv_timeout(wait) {
            Ok(event) => event,
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            // Scanner stopped: device closed or unplugged.
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        };

        if cli.use_json() {
            let timestamp_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_millis());
            // One event per line regardless of --format.
            match serde_json::to_string(&WatchEvent { event, timestamp_ms }) {
                Ok(line) => println!("{line}"),
                Err(e) => tracing::warn!(error = %e, "Cannot serialize key event"),
            }
        } else {
            let action = if event.pressed {
                style("pressed").green()
            } else {
                style("released").dim()
            };
            println!("Key {:>2} {}", event.index, action);
        }

        if args.once {
            break;
        }
    }

    session.close();
    events.join()
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty(),
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        println!("hiddeck {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() { " (dirty)" } else { "" }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
    Ok(())
}

// === Output Helpers ===

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    let json = if cli.use_compact_json() {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    match json {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Cannot serialize output"),
    }
}

fn output_error(cli: &Cli, error: &DeckError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!("{json}");
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
