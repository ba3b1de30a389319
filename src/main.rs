use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use opencut_lib::{
    FrameSource, OpenCutError, OpenCutResult, PalettePolicy, RecordingConfig, RecordingSession,
    Region, SessionState, XcapFrameSource,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PaletteArg {
    /// One palette shared by every frame
    Global,
    /// Adaptive palette per frame
    PerFrame,
}

impl From<PaletteArg> for PalettePolicy {
    fn from(arg: PaletteArg) -> Self {
        match arg {
            PaletteArg::Global => PalettePolicy::Global,
            PaletteArg::PerFrame => PalettePolicy::PerFrame,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "opencut")]
#[command(version, about = "Record a screen region and save it as a looping GIF")]
struct Cli {
    /// List displays and exit
    #[arg(long, action = ArgAction::SetTrue)]
    list_displays: bool,

    /// Left edge of the region in virtual screen coordinates
    #[arg(short = 'x', long, default_value_t = 0, allow_negative_numbers = true)]
    x: i32,

    /// Top edge of the region in virtual screen coordinates
    #[arg(short = 'y', long, default_value_t = 0, allow_negative_numbers = true)]
    y: i32,

    /// Region width. Without width and height the whole primary display is recorded
    #[arg(short = 'W', long, requires = "height")]
    width: Option<u32>,

    /// Region height
    #[arg(short = 'H', long, requires = "width")]
    height: Option<u32>,

    /// Recording length in seconds
    #[arg(short = 's', long, default_value_t = 5.0, value_parser = parse_seconds)]
    seconds: f64,

    /// Capture rate (overrides the config file)
    #[arg(long)]
    fps: Option<u32>,

    /// Quality 1-100 (overrides the config file)
    #[arg(short = 'q', long)]
    quality: Option<u32>,

    #[arg(long, value_enum)]
    palette: Option<PaletteArg>,

    /// JSON recording config
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output GIF (defaults to the videos directory)
    #[arg(short = 'o', long, value_name = "FILE")]
    output: Option<PathBuf>,
}

fn main() -> OpenCutResult<()> {
    env_logger::init();

    let cli = Cli::parse();
    let source = Arc::new(XcapFrameSource::new());

    if cli.list_displays {
        for display in source.displays()? {
            println!(
                "{}: {}x{}+{}+{}{}",
                display.name,
                display.width,
                display.height,
                display.x,
                display.y,
                if display.is_primary { " (primary)" } else { "" }
            );
        }
        return Ok(());
    }

    let config = build_config(&cli)?;
    let region = resolve_region(&cli, &*source)?;
    let output = cli.output.clone().unwrap_or_else(default_output_path);

    let mut session = RecordingSession::new(config, source);
    session.select_region(region)?;
    session.start()?;
    println!("Recording {} for {:.1}s...", region, cli.seconds);

    let ended = session.wait_for_stop(Duration::from_secs_f64(cli.seconds))?;
    if !ended {
        session.stop()?;
    }

    if let SessionState::Stopped { reason, .. } = session.state() {
        if reason.is_automatic() {
            log::warn!("Recording ended early: {:?}", reason);
        }
    }

    let recorded = session.summary();
    println!(
        "Captured {} frames over {:.2}s ({} ticks dropped)",
        recorded.frame_count, recorded.duration_secs, recorded.dropped_ticks
    );

    let exported = session.export(&output)?;
    println!(
        "Saved {} ({} bytes, {:.2}s per loop)",
        exported.path.display(),
        exported.file_size_bytes,
        exported.duration_secs
    );
    Ok(())
}

fn build_config(cli: &Cli) -> OpenCutResult<RecordingConfig> {
    let mut config = match &cli.config {
        Some(path) => RecordingConfig::load(path)?,
        None => RecordingConfig::default(),
    };
    if let Some(fps) = cli.fps {
        config.frame_interval_ms = RecordingConfig::from_fps(fps).frame_interval_ms;
    }
    if let Some(quality) = cli.quality {
        config.quality = quality;
    }
    if let Some(palette) = cli.palette {
        config.palette_policy = palette.into();
    }
    config.validate();
    Ok(config)
}

fn resolve_region(cli: &Cli, source: &dyn FrameSource) -> OpenCutResult<Region> {
    if let (Some(width), Some(height)) = (cli.width, cli.height) {
        return Ok(Region::new(cli.x, cli.y, width, height));
    }

    let displays = source.displays()?;
    let primary = displays
        .iter()
        .find(|d| d.is_primary)
        .or_else(|| displays.first())
        .ok_or_else(|| OpenCutError::CaptureError("No displays found".to_string()))?;

    Ok(primary.as_region())
}

/// Recording length: finite, non-negative and representable as a `Duration`.
fn parse_seconds(value: &str) -> Result<f64, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|e| format!("`{}` is not a number: {}", value, e))?;
    if seconds < 0.0 {
        return Err(format!("`{}` is negative", value));
    }
    Duration::try_from_secs_f64(seconds)
        .map_err(|e| format!("`{}` is not a valid length: {}", value, e))?;
    Ok(seconds)
}

fn default_output_path() -> PathBuf {
    let dir = dirs::video_dir()
        .or_else(dirs::download_dir)
        .unwrap_or_else(std::env::temp_dir);
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("opencut_{}.gif", timestamp))
}
