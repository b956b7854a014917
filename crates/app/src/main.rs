use std::{io::BufRead, path::PathBuf, thread, time::Duration};

use beatdrop_core::{
    chart_rng, spawn_line_reader, BeatSchedule, CommandSurface, GameConfig, InputReaderHandle,
    InputSender, KeyMap, Renderer, ScheduleGenerator, Session, Surface, TempoEstimator,
    WallClockPlayback,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod terminal;
mod wav;

use terminal::TerminalSurface;

fn main() -> beatdrop_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };

    match cli.command {
        Commands::Analyze { input, out } => run_analyze(&config, &input, out.as_ref()),
        Commands::Play {
            input,
            chart,
            device,
            fps,
            headless,
        } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            let result = runtime.block_on(run_play(
                config,
                PlayOptions {
                    input,
                    chart,
                    device,
                    fps,
                    headless,
                },
            ));
            // Blocking device reads may still be parked on the blocking pool.
            runtime.shutdown_background();
            result
        }
    }
}

fn run_analyze(
    config: &GameConfig,
    input: &PathBuf,
    out: Option<&PathBuf>,
) -> beatdrop_core::Result<()> {
    tracing::info!(?input, "analysing track");

    let track = wav::read_track(input)?;
    let tempo = TempoEstimator::new(config.analysis.clone()).analyse(&track);
    let schedule = ScheduleGenerator::new(config.chart.clone()).generate(
        tempo.bpm as f64,
        track.duration(),
        &mut chart_rng(config.chart.seed),
    );

    println!(
        "tempo: {:.0} BPM (raw {}), {} peaks, {} notes over {:.2}s",
        tempo.bpm,
        tempo
            .raw_bpm
            .map(|bpm| format!("{bpm:.1}"))
            .unwrap_or_else(|| "n/a".to_string()),
        tempo.peak_count,
        schedule.len(),
        track.duration()
    );

    if let Some(out) = out {
        schedule.save_json(out)?;
        tracing::info!(?out, notes = schedule.len(), "chart written");
    }
    Ok(())
}

struct PlayOptions {
    input: PathBuf,
    chart: Option<PathBuf>,
    device: Option<PathBuf>,
    fps: u32,
    headless: bool,
}

async fn run_play(config: GameConfig, options: PlayOptions) -> beatdrop_core::Result<()> {
    let track = wav::read_track(&options.input)?;
    let duration = track.duration();
    let keys = KeyMap::new(&config.input);
    let (width, height) = (config.playfield.width, config.playfield.height);

    let mut session = Session::new(config, WallClockPlayback::new());
    match &options.chart {
        Some(path) => session.load_track_with_chart(track, BeatSchedule::load_json(path)?),
        None => {
            session.load_track(track);
        }
    }

    // Never joined: a blocking stdin read cannot be interrupted, and the
    // thread ends with the process.
    let stdin = std::io::BufReader::new(std::io::stdin());
    let _keyboard = spawn_keyboard_reader(stdin, keys, session.input_sender());
    let mut device = match &options.device {
        Some(path) => connect_device(path, session.input_sender()).await,
        None => None,
    };

    let renderer = Renderer::new();
    let mut surface: Box<dyn FrameSurface> = if options.headless {
        Box::new(CommandSurface::new(width, height))
    } else {
        print!("\x1b[2J");
        Box::new(TerminalSurface::new(width, height, 60, 20))
    };

    let mut frames =
        tokio::time::interval(Duration::from_secs_f64(1.0 / options.fps.max(1) as f64));
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    session.start()?;
    loop {
        tokio::select! {
            _ = frames.tick() => {
                session.tick();
                renderer.draw(&session.snapshot(), surface.as_surface());
                surface.present()?;

                let past_end = session.elapsed().map(|t| t >= duration).unwrap_or(true);
                if session.is_finished() && past_end {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    let stats = session.stats();
    session.stop();
    if let Some(device) = device.as_mut() {
        device.shutdown();
    }

    println!(
        "final score: {} ({} hits, {} misses, {} bonuses)",
        session.score(),
        stats.hits,
        stats.misses,
        stats.bonuses
    );
    Ok(())
}

/// Opens a line-based controller transport. A failure is reported once and
/// play continues with the keyboard only.
async fn connect_device(path: &PathBuf, sender: InputSender) -> Option<InputReaderHandle> {
    match tokio::fs::File::open(path).await {
        Ok(file) => {
            tracing::info!(?path, "controller connected");
            Some(spawn_line_reader(file, sender))
        }
        Err(err) => {
            tracing::warn!(?path, %err, "controller connection failed, keyboard input only");
            None
        }
    }
}

/// Reads keyboard lines on a detached thread; each bound character is one
/// press. Undecodable bytes are replaced and skipped.
fn spawn_keyboard_reader<R>(reader: R, keys: KeyMap, sender: InputSender) -> thread::JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || forward_keys(reader, &keys, &sender))
}

fn forward_keys<R: BufRead>(mut reader: R, keys: &KeyMap, sender: &InputSender) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => return,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                for event in line.chars().filter_map(|key| keys.event_for_key(key)) {
                    if sender.send(event).is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                tracing::warn!(%err, "keyboard input failed, reader stopped");
                return;
            }
        }
    }
}

/// A surface the frame loop can also flush.
trait FrameSurface {
    fn as_surface(&mut self) -> &mut dyn Surface;
    fn present(&self) -> beatdrop_core::Result<()>;
}

impl FrameSurface for TerminalSurface {
    fn as_surface(&mut self) -> &mut dyn Surface {
        self
    }

    fn present(&self) -> beatdrop_core::Result<()> {
        Ok(TerminalSurface::present(self)?)
    }
}

impl FrameSurface for CommandSurface {
    fn as_surface(&mut self) -> &mut dyn Surface {
        self
    }

    fn present(&self) -> beatdrop_core::Result<()> {
        tracing::trace!(commands = self.commands().len(), "frame");
        Ok(())
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm game played against any audio track", long_about = None)]
struct Cli {
    /// JSON config file; missing keys keep their defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Estimate the tempo of a WAV file and optionally write a beat chart.
    Analyze {
        /// Path to the WAV file that should be analysed.
        input: PathBuf,
        /// Output path for the generated chart.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Play a WAV file. Type the left/right keys followed by Enter to hit notes.
    Play {
        input: PathBuf,
        /// Play a prepared chart instead of generating one.
        #[arg(long)]
        chart: Option<PathBuf>,
        /// Line-based controller transport (e.g. a serial device node).
        #[arg(short, long)]
        device: Option<PathBuf>,
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Skip terminal drawing.
        #[arg(long)]
        headless: bool,
    },
}
