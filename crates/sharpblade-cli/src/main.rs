//! SharpBlade Control Tool
//!
//! Captures screens or windows to image files (for dynamic key and touchpad
//! thumbnails) and inspects or repairs misnamed `.rzdisplaystate` files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use image::ImageFormat;
use serde::Serialize;
use sharpblade_hw::capture::{self, WindowHandle};
use sharpblade_hw::{DisplayStateDescriptor, DisplayStateFile};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sharpbladectl")]
#[command(about = "Control tool for SwitchBlade apps")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a screenshot of the desktop or a window
    Capture {
        /// Output file path
        #[arg(default_value = "capture.png")]
        output: PathBuf,

        /// Window handle to capture (decimal or 0x-prefixed hex; default: desktop)
        #[arg(long, value_parser = parse_window_handle)]
        window: Option<WindowHandle>,

        /// Image format (default: from the output extension)
        #[arg(long, value_enum)]
        format: Option<CaptureFormat>,
    },
    /// RzDisplayState file commands
    DisplayState {
        #[command(subcommand)]
        action: DisplayStateCommands,
    },
}

#[derive(Subcommand)]
enum DisplayStateCommands {
    /// Show whether an app needs the workaround and which files exist
    Check {
        #[command(flatten)]
        target: DisplayStateTarget,
    },
    /// Copy the misnamed file to the name the device expects
    Fix {
        #[command(flatten)]
        target: DisplayStateTarget,
    },
}

#[derive(clap::Args)]
struct DisplayStateTarget {
    /// App name (executable name without extension)
    #[arg(long)]
    app: String,

    /// Directory holding the state files (default: current directory)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum CaptureFormat {
    Png,
    Jpeg,
    Bmp,
}

impl From<CaptureFormat> for ImageFormat {
    fn from(format: CaptureFormat) -> Self {
        match format {
            CaptureFormat::Png => ImageFormat::Png,
            CaptureFormat::Jpeg => ImageFormat::Jpeg,
            CaptureFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

fn parse_window_handle(value: &str) -> Result<WindowHandle, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => isize::from_str_radix(hex, 16),
        None => value.parse::<isize>(),
    };
    parsed
        .map(WindowHandle)
        .map_err(|e| format!("invalid window handle '{}': {}", value, e))
}

/// State of one app's display state files.
#[derive(Debug, Serialize)]
struct DisplayStateReport {
    app: String,
    file: String,
    compatible: bool,
    raw_path: PathBuf,
    raw_exists: bool,
    corrected_path: PathBuf,
    corrected_exists: bool,
}

impl DisplayStateReport {
    fn new(file: &DisplayStateFile) -> Self {
        let descriptor = file.descriptor();
        Self {
            app: descriptor.app().to_string(),
            file: descriptor.file().to_string(),
            compatible: descriptor.is_compatible(),
            raw_path: file.raw_path().to_path_buf(),
            raw_exists: file.raw_path().is_file(),
            corrected_path: file.corrected_path().to_path_buf(),
            corrected_exists: file.corrected_path().is_file(),
        }
    }

    fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(self)?);
            return Ok(());
        }

        println!("RzDisplayState for {}:", self.app);
        println!(
            "  Compatible: {}",
            if self.compatible {
                "yes"
            } else {
                "no (workaround required)"
            }
        );
        println!(
            "  {}: {}",
            self.raw_path.display(),
            if self.raw_exists { "present" } else { "missing" }
        );
        println!(
            "  {}: {}",
            self.corrected_path.display(),
            if self.corrected_exists {
                "present"
            } else {
                "missing"
            }
        );
        Ok(())
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Capture {
            output,
            window,
            format,
        } => handle_capture(&output, window, format),
        Commands::DisplayState { action } => handle_display_state(action),
    }
}

fn handle_capture(
    output: &Path,
    window: Option<WindowHandle>,
    format: Option<CaptureFormat>,
) -> Result<()> {
    let format = match format {
        Some(format) => format.into(),
        None => ImageFormat::from_path(output)
            .with_context(|| format!("Unknown image format for {}", output.display()))?,
    };

    let gfx = capture::system()?;
    let captured = match window {
        Some(window) => capture::capture_window_to_file(gfx.as_ref(), window, output, format),
        None => capture::capture_screen_to_file(gfx.as_ref(), output, format),
    };
    captured.context("Capture failed")?;

    println!("Capture saved to: {}", output.display());
    Ok(())
}

fn open_display_state(target: &DisplayStateTarget) -> Result<DisplayStateFile> {
    let dir = match &target.dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    debug!("Looking for display state files in {}", dir.display());
    // Never armed here, so the poll interval is unused
    Ok(DisplayStateFile::new(
        DisplayStateDescriptor::new(target.app.clone()),
        dir,
        Duration::from_millis(500),
    ))
}

fn handle_display_state(action: DisplayStateCommands) -> Result<()> {
    match action {
        DisplayStateCommands::Check { target } => {
            let file = open_display_state(&target)?;
            DisplayStateReport::new(&file).print(target.json)?;
        }
        DisplayStateCommands::Fix { target } => {
            let file = open_display_state(&target)?;
            if !file.workaround_required() && !target.json {
                println!(
                    "Note: {} is already compatible; Razer generates {} itself",
                    target.app,
                    file.descriptor().file()
                );
            }
            file.fix();
            let report = DisplayStateReport::new(&file);
            if !report.raw_exists && !target.json {
                println!("Nothing to fix: {} not found", report.raw_path.display());
            }
            report.print(target.json)?;
        }
    }
    Ok(())
}
