use std::{
    collections::BTreeSet,
    io::{self, Write},
    path::PathBuf,
    sync::Arc,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use framepick::{
    Acquirer, FfmpegDecoder, FrameNaming, Intent, OperationType, Outcome, ProgressCallback,
    ProgressInfo, Session, SessionOptions, SourceDescriptor, YtDlpFetcher,
};
use image::{DynamicImage, imageops::FilterType};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framepick browse clip.mp4\n  framepick browse 'https://www.youtube.com/watch?v=TIF3xiap60U' --out shots\n  framepick export clip.mp4 --frames 0,10-20,500\n  framepick archive --to frames.zip\n  framepick completions zsh > _framepick";

const BROWSE_HELP: &str = "a/d step  A/D jump 10  g seek  Home/End  s save  z zip  v copy video  r reset frames  q quit";

/// Lines kept free below the frame preview.
const STATUS_LINES: u16 = 4;

#[derive(Debug, Parser)]
#[command(
    name = "framepick",
    version,
    about = "Browse a video frame by frame and save the frames you want",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct GlobalOptions {
    /// Show debug logging, including FFmpeg's own messages.
    #[arg(long, global = true)]
    verbose: bool,

    /// Only log errors.
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Directory where saved frames accumulate.
    #[arg(long, global = true, default_value = "frames")]
    out: PathBuf,

    /// Name frames frame_NNNNNN.jpg instead of <label>_frame_NNNNNN.jpg.
    #[arg(long, global = true)]
    plain_names: bool,

    /// JPEG quality (1-100).
    #[arg(long, global = true, default_value_t = 95)]
    quality: u8,

    /// Downloader executable used for remote sources.
    #[arg(long, global = true, default_value = "yt-dlp")]
    downloader: String,

    /// Directory for transient media copies (defaults to the system temp dir).
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Step through a video in the terminal and save frames.
    #[command(
        about = "Browse frames interactively",
        after_help = "Keys:\n  a / Left        previous frame\n  d / Right       next frame\n  A / PageUp      10 frames back\n  D / PageDown    10 frames forward\n  Home / End      first / last frame\n  g <n> Enter     go to frame n\n  s               save current frame\n  z               build frames archive\n  v               copy the video into the working directory\n  r               delete saved frames\n  q / Esc         quit"
    )]
    Browse {
        /// Video path or http(s) URL.
        source: String,
        /// Empty the output directory before starting.
        #[arg(long)]
        fresh: bool,
    },

    /// Save specific frames without the interactive browser.
    #[command(
        about = "Save selected frames",
        after_help = "Examples:\n  framepick export clip.mp4 --frames 0,10-20,500"
    )]
    Export {
        /// Video path or http(s) URL.
        source: String,
        /// Comma-separated frame indices and inclusive ranges (a-b).
        #[arg(long)]
        frames: String,
    },

    /// Print video properties.
    #[command(about = "Print video metadata", visible_alias = "probe")]
    Info {
        /// Video path or http(s) URL.
        source: String,
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// List saved frames.
    #[command(about = "List saved frames")]
    List,

    /// Pack saved frames into a zip archive.
    #[command(about = "Build the frames archive")]
    Archive {
        /// Archive path (defaults to frames.zip in the temp dir).
        #[arg(long)]
        to: Option<PathBuf>,
    },

    /// Delete all saved frames.
    #[command(about = "Empty the output directory")]
    Reset,

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Progress bar shared by downloads, frame scans, and archive builds.
struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Self {
        let bar = ProgressBar::hidden();
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} {msg:12} {bar:40.cyan/blue} {pos}/{len}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        Self { bar }
    }

    fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if self.bar.is_hidden() {
            self.bar
                .set_draw_target(indicatif::ProgressDrawTarget::stderr());
        }
        let message = match info.operation {
            OperationType::Download => "download",
            OperationType::FrameScan => "scanning",
            OperationType::ArchiveBuild => "archiving",
            _ => "working",
        };
        self.bar.set_message(message);
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
    }
}

fn init_logging(global: &GlobalOptions) {
    let level = if global.verbose {
        "debug"
    } else if global.quiet {
        "error"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
    framepick::configure_ffmpeg_logging(global.verbose);
}

fn session_options(
    global: &GlobalOptions,
    progress: Arc<TerminalProgress>,
) -> SessionOptions {
    let naming = if global.plain_names {
        FrameNaming::Plain
    } else {
        FrameNaming::Labelled
    };
    let mut options = SessionOptions::new()
        .with_output_directory(&global.out)
        .with_naming(naming)
        .with_jpeg_quality(global.quality)
        .with_progress(progress);
    if let Some(temp_dir) = &global.temp_dir {
        options = options.with_temporary_directory(temp_dir);
    }
    options
}

/// Create a session and load `source` into it.
fn open_session(
    global: &GlobalOptions,
    source: &str,
    fresh: bool,
) -> Result<Session, Box<dyn std::error::Error>> {
    let progress = Arc::new(TerminalProgress::new());
    let options = session_options(global, Arc::clone(&progress)).with_fresh_output(fresh);
    let fetcher = YtDlpFetcher::new().with_program(global.downloader.clone());
    let acquirer = Acquirer::from_options(&options, Box::new(fetcher));
    let decoder = FfmpegDecoder::new().with_progress(progress.clone());
    let mut session = Session::new(options, Box::new(decoder))?;

    if source.contains("://") {
        eprintln!("{} {source}", "downloading".cyan().bold());
    }
    let loaded = acquirer
        .acquire(SourceDescriptor::from_input(source))
        .and_then(|media| session.load(media));
    progress.clear();
    loaded?;
    Ok(session)
}

/// Inclusive frame range from `--frames`; a single index is `(n, n)`.
type FrameRange = (i64, i64);

/// Parse `0,10-20,500` into frame ranges, in the given order.
///
/// Ranges stay unexpanded until the frame count is known.
fn parse_frame_list(value: &str) -> Result<Vec<FrameRange>, String> {
    let mut ranges = Vec::new();
    for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: i64 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid range start in {part:?}"))?;
                let end: i64 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid range end in {part:?}"))?;
                if start > end {
                    return Err(format!("range {part:?} runs backwards"));
                }
                ranges.push((start, end));
            }
            None => {
                let index: i64 = part
                    .parse()
                    .map_err(|_| format!("invalid frame index {part:?}"))?;
                ranges.push((index, index));
            }
        }
    }
    if ranges.is_empty() {
        return Err("no frames given".to_string());
    }
    Ok(ranges)
}

/// Clamp `ranges` into `[0, total_frames)` and list each index once, in
/// first-seen order.
fn resolve_frame_indices(ranges: &[FrameRange], total_frames: u64) -> Vec<u64> {
    let Some(last) = total_frames.checked_sub(1) else {
        return Vec::new();
    };
    let last = i64::try_from(last).unwrap_or(i64::MAX);
    let clamp = |value: i64| value.clamp(0, last) as u64;

    let mut seen = BTreeSet::new();
    let mut indices = Vec::new();
    for &(start, end) in ranges {
        for index in clamp(start)..=clamp(end) {
            if seen.insert(index) {
                indices.push(index);
            }
        }
    }
    indices
}

/// What a key press asks the browser to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Apply(Intent),
    BuildArchive,
    CopyVideo,
    StartSeek,
    Quit,
    Ignore,
}

fn map_key(key: KeyEvent) -> KeyAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyAction::Quit;
    }
    match key.code {
        KeyCode::Char('a') | KeyCode::Left => KeyAction::Apply(Intent::StepBackward),
        KeyCode::Char('d') | KeyCode::Right => KeyAction::Apply(Intent::StepForward),
        KeyCode::Char('A') | KeyCode::PageUp => KeyAction::Apply(Intent::JumpBackward),
        KeyCode::Char('D') | KeyCode::PageDown => KeyAction::Apply(Intent::JumpForward),
        KeyCode::Home => KeyAction::Apply(Intent::Seek(0)),
        KeyCode::End => KeyAction::Apply(Intent::Seek(i64::MAX)),
        KeyCode::Char('s') => KeyAction::Apply(Intent::SaveFrame),
        KeyCode::Char('r') => KeyAction::Apply(Intent::ResetFrames),
        KeyCode::Char('z') => KeyAction::BuildArchive,
        KeyCode::Char('v') => KeyAction::CopyVideo,
        KeyCode::Char('g') => KeyAction::StartSeek,
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        _ => KeyAction::Ignore,
    }
}

/// Raw mode and the alternate screen, undone on drop.
struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = Self;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

/// Draw `image` with upper-half blocks: two pixel rows per text row.
fn render_frame(image: &DynamicImage, columns: u16, rows: u16) -> String {
    let max_width = u32::from(columns.max(1));
    let max_height = u32::from(rows.max(1)) * 2;
    let preview = image
        .resize(max_width, max_height, FilterType::Triangle)
        .to_rgb8();

    let mut out = String::new();
    for y in (0..preview.height()).step_by(2) {
        for x in 0..preview.width() {
            let top = preview.get_pixel(x, y);
            let bottom = if y + 1 < preview.height() {
                *preview.get_pixel(x, y + 1)
            } else {
                image::Rgb([0, 0, 0])
            };
            let cell = "▀"
                .truecolor(top[0], top[1], top[2])
                .on_truecolor(bottom[0], bottom[1], bottom[2]);
            out.push_str(&cell.to_string());
        }
        out.push_str("\r\n");
    }
    out
}

fn draw(session: &mut Session, status: &str, prompt: Option<&str>) -> io::Result<()> {
    let (columns, rows) = terminal::size()?;
    let frame = session.current_frame();
    let view = session.view();

    let mut screen = match &frame {
        Some(image) => render_frame(image, columns, rows.saturating_sub(STATUS_LINES)),
        None => format!("{}\r\n", "frame unavailable".yellow()),
    };

    let last = view.total_frames.saturating_sub(1);
    screen.push_str(&format!(
        "{} {}  frame {}/{}  saved {}\r\n",
        "video".cyan().bold(),
        view.label.as_deref().unwrap_or("-"),
        view.current_index,
        last,
        view.saved_frames.len(),
    ));
    match prompt {
        Some(digits) => screen.push_str(&format!("go to frame: {digits}\r\n")),
        None => screen.push_str(&format!("{}\r\n", BROWSE_HELP.dimmed())),
    }
    screen.push_str(status);

    let mut stdout = io::stdout();
    queue!(stdout, MoveTo(0, 0), Clear(ClearType::All))?;
    stdout.write_all(screen.as_bytes())?;
    stdout.flush()
}

fn browse(session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    colored::control::set_override(true);
    let _guard = TerminalGuard::enter()?;

    let mut status = String::new();
    let mut seek_digits: Option<String> = None;

    loop {
        draw(session, &status, seek_digits.as_deref())?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(digits) = seek_digits.as_mut() {
            match key.code {
                KeyCode::Char(c) if c.is_ascii_digit() => digits.push(c),
                KeyCode::Backspace => {
                    digits.pop();
                }
                KeyCode::Enter => {
                    if let Ok(target) = digits.parse::<i64>() {
                        session.apply(Intent::Seek(target))?;
                    }
                    seek_digits = None;
                }
                KeyCode::Esc => seek_digits = None,
                _ => {}
            }
            continue;
        }

        status = match map_key(key) {
            KeyAction::Quit => break,
            KeyAction::Ignore => continue,
            KeyAction::StartSeek => {
                seek_digits = Some(String::new());
                continue;
            }
            KeyAction::BuildArchive => match session.build_archive() {
                Ok(path) => format!("{} {}", "archived".green(), path.display()),
                Err(error) => format!("{} {error}", "error:".red()),
            },
            KeyAction::CopyVideo => match session.copy_video_to(&std::env::current_dir()?) {
                Ok(path) => format!("{} {}", "copied".green(), path.display()),
                Err(error) => format!("{} {error}", "error:".red()),
            },
            KeyAction::Apply(intent) => match session.apply(intent) {
                Ok(Outcome::Saved(path)) => format!("{} {}", "saved".green(), path.display()),
                Ok(Outcome::NothingToSave) => "nothing to save".yellow().to_string(),
                Ok(Outcome::FramesReset) => "saved frames deleted".yellow().to_string(),
                Ok(_) => String::new(),
                Err(error) => format!("{} {error}", "error:".red()),
            },
        };
    }

    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Browse { source, fresh } => {
            let mut session = open_session(&cli.global, &source, fresh)?;
            browse(&mut session)?;
            let saved = session.saved_frames()?.len();
            println!(
                "{} {}",
                "done:".green().bold(),
                format!("{saved} frame(s) in {}", session.output_directory().display()).green()
            );
        }
        Commands::Export { source, frames } => {
            let ranges = parse_frame_list(&frames)?;
            let mut session = open_session(&cli.global, &source, false)?;
            let indices = resolve_frame_indices(&ranges, session.navigator().total_frames());
            if indices.is_empty() {
                eprintln!("{} video has no frames", "warning:".yellow().bold());
            }

            let progress_bar = ProgressBar::new(indices.len() as u64);
            let template = "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}";
            progress_bar.set_style(ProgressStyle::with_template(template)?.progress_chars("##-"));

            let mut saved = 0_u64;
            for index in indices {
                session.apply(Intent::Seek(i64::try_from(index).unwrap_or(i64::MAX)))?;
                match session.apply(Intent::SaveFrame)? {
                    Outcome::Saved(path) => {
                        saved += 1;
                        if cli.global.verbose {
                            progress_bar.println(format!("saved {}", path.display()));
                        }
                    }
                    _ => progress_bar.println(format!(
                        "{} frame {} unavailable",
                        "warning:".yellow().bold(),
                        session.navigator().current_index()
                    )),
                }
                progress_bar.inc(1);
            }
            progress_bar.finish_and_clear();

            println!(
                "{} {}",
                "success:".green().bold(),
                format!("Saved {saved} frame(s) to {}", session.output_directory().display())
                    .green()
            );
        }
        Commands::Info { source, json } => {
            let session = open_session(&cli.global, &source, false)?;
            let metadata = session.metadata().ok_or("no video loaded")?;
            let label = session.label().unwrap_or_default();
            if json {
                let payload = json!({
                    "label": label,
                    "format": metadata.format,
                    "codec": metadata.codec,
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Label: {label}");
                println!("Format: {}", metadata.format);
                println!(
                    "Video: {}x{} @ {:.2} fps [{}]",
                    metadata.width, metadata.height, metadata.frames_per_second, metadata.codec
                );
                println!("Frames: {}", metadata.frame_count);
                println!("Duration: {:?}", metadata.duration);
            }
        }
        Commands::List => {
            let names = framepick::list_outputs(&cli.global.out)?;
            if names.is_empty() {
                println!("Saved frames: none");
            } else {
                println!("Saved frames:");
                for name in names {
                    println!("- {name}");
                }
            }
        }
        Commands::Archive { to } => {
            let progress = Arc::new(TerminalProgress::new());
            let options = session_options(&cli.global, Arc::clone(&progress));
            let archive_path = to.unwrap_or_else(|| options.archive_path());
            let count = framepick::list_outputs(&cli.global.out)?.len();
            if count == 0 {
                eprintln!("{} no saved frames to archive", "warning:".yellow().bold());
            }
            let path = framepick::build_archive_with_progress(
                &cli.global.out,
                &archive_path,
                progress.clone(),
            )?;
            progress.clear();
            println!("{} {}", "saved".green().bold(), path.display());
        }
        Commands::Reset => {
            framepick::reset_outputs(&cli.global.out)?;
            println!("{} {}", "emptied".green().bold(), cli.global.out.display());
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framepick", &mut io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
