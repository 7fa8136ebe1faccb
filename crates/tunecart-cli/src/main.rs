use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tunecart_library::{BatchConverter, FfmpegTranscoder, Settings, SettingsOverrides, WebCoverSearch, reader_for};
use tunecart_paths::TunecartPaths;

mod console;
mod preview;
mod session;

use crate::preview::WindowPreview;
use crate::session::{Session, SessionOptions};

#[derive(Parser, Debug)]
#[command(name = "tunecart", version)]
#[command(about = "Pick FLAC albums, songs and cover art, then convert them with ffmpeg")]
struct Args {
    /// Configuration file (default: ./config.yaml, then the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Album folder to convert, instead of choosing from the list
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Destination folder, instead of building it from tags
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Convert every song of the album without asking
    #[arg(short, long)]
    entire: bool,

    /// Use the most recently modified album
    #[arg(short, long)]
    latest: bool,

    /// Do not look for cover art
    #[arg(long)]
    skip_cover_art: bool,

    /// Use tag values for folder names without confirmation
    #[arg(long)]
    skip_dir_prompts: bool,

    /// Mark every album as a compilation
    #[arg(long, conflicts_with = "not_compilation")]
    compilation: bool,

    /// Mark every album as not a compilation
    #[arg(long)]
    not_compilation: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            entire: self.entire.then_some(true),
            latest: self.latest.then_some(true),
            get_cover_art: self.skip_cover_art.then_some(false),
            dir_name_prompts: self.skip_dir_prompts.then_some(false),
        }
    }

    fn session_options(&self) -> SessionOptions {
        let compilation = match (self.compilation, self.not_compilation) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        SessionOptions {
            source: self.source.clone(),
            destination: self.destination.clone(),
            compilation,
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_settings(args: &Args) -> Result<Settings> {
    let paths = TunecartPaths::new()?;
    let cwd = std::env::current_dir().context("Cannot read the current directory")?;

    let config_file = match paths.locate_config(args.config.as_deref(), &cwd) {
        Ok(path) => path,
        Err(tunecart_paths::Error::ConfigNotFound(candidates)) => {
            paths.ensure_structure()?;
            let searched: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            bail!("No configuration file found. Searched: {}", searched.join(", "));
        }
        Err(e) => return Err(e.into()),
    };

    info!(config = %config_file.display(), "loading configuration");
    let settings = Settings::from_file(&config_file)
        .with_context(|| format!("Invalid configuration in {}", config_file.display()))?
        .with_overrides(args.overrides());
    Ok(settings)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let settings = load_settings(&args)?;

    let destination_root = args.destination.as_deref().unwrap_or(&settings.destination_root);
    tunecart_paths::ensure_dir(destination_root)
        .with_context(|| format!("Cannot create {}", destination_root.display()))?;
    tunecart_paths::check_writable(destination_root)?;

    let reader = reader_for(&settings);
    let mut console = console::stdio_console();
    let mut preview = WindowPreview::new();
    let search = WebCoverSearch::new();

    let queue = Session {
        settings: &settings,
        options: args.session_options(),
        console: console.as_mut(),
        reader: reader.as_ref(),
        preview: &mut preview,
        search: &search,
    }
    .collect()?;

    if queue.is_empty() {
        warn!("nothing to convert");
        return Ok(());
    }

    let progress = ProgressBar::new(0);
    progress.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}")?);

    let transcoder = FfmpegTranscoder::new(&settings.ffmpeg_bin);
    let albums = queue.len();
    let report = BatchConverter::new(reader.as_ref(), &transcoder).run(queue, &progress)?;

    println!(
        "Done: {albums} album(s), {} file(s) converted, {} already present.",
        report.converted, report.skipped
    );
    Ok(())
}
