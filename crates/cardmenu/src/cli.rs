use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cardmenu",
    author,
    version,
    about = "Animated card-grid reveal menu",
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(flatten)]
    pub run: RunArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Configuration file to use instead of the one in the config directory.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Number of frames to drive before exiting.
    #[arg(long, value_name = "COUNT", default_value_t = 120)]
    pub frames: u64,

    /// Frame rate cap for the animation loop (0=uncapped).
    #[arg(long, value_name = "FPS", default_value_t = 60.0)]
    pub fps: f32,

    /// Elapsed seconds at which the still export is evaluated.
    #[arg(long, value_name = "SECONDS", value_parser = parse_seconds)]
    pub time: Option<Duration>,

    /// Export a still frame to the provided PNG path then exit.
    #[arg(long, value_name = "PATH", value_parser = parse_export_path)]
    pub export: Option<PathBuf>,

    /// Still export resolution (e.g. `1024x1024`).
    #[arg(
        long,
        value_name = "WIDTHxHEIGHT",
        value_parser = parse_surface_size,
        default_value = "1024x1024"
    )]
    pub size: (u32, u32),

    /// Use generated placeholder tiles instead of fetching card images.
    #[arg(long)]
    pub offline: bool,

    /// Override `fetch.concurrency` from the config file.
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Override `fetch.timeout` from the config file.
    #[arg(long, value_name = "MILLISECONDS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the rest position of every card in the grid.
    Layout {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML.
    Config,
    /// Print the resolved configuration directory and file.
    Where,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_surface_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let width = w
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid width '{}'", w.trim()))?;
    let height = h
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid height '{}'", h.trim()))?;
    if width == 0 || height == 0 {
        return Err("size must be greater than zero".into());
    }
    Ok((width, height))
}

pub fn parse_seconds(value: &str) -> Result<Duration, String> {
    let seconds = value
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid time '{value}'; expected seconds"))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err("time must be a non-negative number of seconds".into());
    }
    Duration::try_from_secs_f32(seconds)
        .map_err(|err| format!("time '{value}' is out of range: {err}"))
}

pub fn parse_export_path(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => Ok(path),
        None => Err("export path has no extension; expected .png".to_string()),
        Some(other) => Err(format!(
            "unsupported export format '.{other}'; expected .png"
        )),
    }
}
