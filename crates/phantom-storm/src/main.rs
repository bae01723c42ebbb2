use anyhow::{bail, Context, Result};
use phantom_storm::audio::{DeviceQuery, SpectrumSource, WavSource};
use phantom_storm::utils::{logging, Config};
use phantom_storm::{FrameReport, StormEngine};
use phantom_storm_api::{DominantBand, Scene, SceneRenderer};
use std::env;
use std::io::{self, BufWriter, Stdout, Write};
use std::time::{Duration, Instant};

const USAGE: &str = "usage: phantom-storm <track.wav> [--seed N] [--sensitivity P] [--fps F] \
[--frames N] [--json] [--realtime] [--live [INDEX|NAME]] [--list-devices]";

/// Accepted `--fps` range
const MIN_FRAME_RATE: f32 = 1.0;
const MAX_FRAME_RATE: f32 = 1000.0;

/// Writes one JSON scene per line to stdout
struct JsonLinesRenderer {
    out: BufWriter<Stdout>,
    error: Option<io::Error>,
}

impl JsonLinesRenderer {
    fn new() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
            error: None,
        }
    }

    fn finish(mut self) -> Result<()> {
        if let Some(e) = self.error.take() {
            return Err(e).context("writing scenes to stdout");
        }
        self.out.flush().context("flushing scenes")
    }
}

impl SceneRenderer for JsonLinesRenderer {
    fn render(&mut self, scene: &Scene) {
        if self.error.is_some() {
            return;
        }
        let result = serde_json::to_writer(&mut self.out, scene)
            .map_err(io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"));
        if let Err(e) = result {
            self.error = Some(e);
        }
    }
}

/// Running totals printed when the track ends
#[derive(Default)]
struct Summary {
    frames: u64,
    triggers: u64,
    flashes: u64,
    bass: u64,
    mid: u64,
    treble: u64,
    peak_illumination: f32,
    peak_live: usize,
}

impl Summary {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.peak_illumination = self.peak_illumination.max(report.illumination.smoothed);
        self.peak_live = self.peak_live.max(report.live_flashes);

        if report.spawned == 0 {
            return;
        }
        self.triggers += 1;
        self.flashes += report.spawned as u64;
        // Every bolt of a strike shares the dominant band
        if let Some(bolt) = report.scene.bolts.last() {
            match bolt.band {
                DominantBand::Bass => self.bass += 1,
                DominantBand::Mid => self.mid += 1,
                DominantBand::Treble => self.treble += 1,
            }
        }
    }

    fn print(&self, frame_rate: f32) {
        println!(
            "{} frames ({:.1}s), {} strikes, {} bolts",
            self.frames,
            self.frames as f32 / frame_rate,
            self.triggers,
            self.flashes
        );
        println!(
            "strikes by band: bass {} | mid {} | treble {}",
            self.bass, self.mid, self.treble
        );
        println!(
            "peak illumination {:.3}, peak live flashes {}",
            self.peak_illumination, self.peak_live
        );
    }
}

struct Options {
    track: Option<String>,
    seed: Option<u64>,
    sensitivity: Option<u32>,
    frame_rate: Option<f32>,
    max_frames: Option<u64>,
    json: bool,
    realtime: bool,
    live: bool,
    device: Option<DeviceQuery>,
    list_devices: bool,
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match flag_value(args, flag) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("invalid value for {}: {}", flag, v)),
        None => Ok(None),
    }
}

impl Options {
    fn parse(args: &[String]) -> Result<Self> {
        const VALUE_FLAGS: [&str; 5] = ["--seed", "--sensitivity", "--fps", "--frames", "--live"];

        // First argument that is neither a flag nor a flag's value
        let track = args
            .iter()
            .enumerate()
            .skip(1)
            .find(|(i, a)| {
                !a.starts_with("--") && !VALUE_FLAGS.contains(&args[i - 1].as_str())
            })
            .map(|(_, a)| a.clone());

        let live = args.contains(&"--live".to_string());
        let device = flag_value(args, "--live")
            .filter(|v| !v.starts_with("--"))
            .map(DeviceQuery::parse);

        Ok(Self {
            track: if live { None } else { track },
            seed: parse_flag(args, "--seed")?,
            sensitivity: parse_flag(args, "--sensitivity")?,
            frame_rate: parse_flag(args, "--fps")?,
            max_frames: parse_flag(args, "--frames")?,
            json: args.contains(&"--json".to_string()),
            realtime: args.contains(&"--realtime".to_string()),
            live,
            device,
            list_devices: args.contains(&"--list-devices".to_string()),
        })
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.contains(&"--help".to_string()) || args.contains(&"-h".to_string()) {
        println!("{}", USAGE);
        return Ok(());
    }

    let options = Options::parse(&args)?;
    let mut config = Config::load();
    if let Err(e) = logging::init(config.log_level()) {
        eprintln!("Warning: logging unavailable: {}", e);
    }

    if options.list_devices {
        return list_devices();
    }

    let mut lightning = config.lightning();
    if options.seed.is_some() {
        lightning.seed = options.seed;
    }
    if options.sensitivity.is_some() {
        lightning.sensitivity = options.sensitivity;
    }
    let frame_rate =
        checked_frame_rate(options.frame_rate.unwrap_or_else(|| config.frame_rate()))?;

    let mut engine = StormEngine::new(&lightning);
    tracing::info!(
        sensitivity = engine.sensitivity(),
        frame_rate,
        seed = ?lightning.seed(),
        "engine ready"
    );

    let mut renderer = options.json.then(JsonLinesRenderer::new);
    let mut summary = Summary::default();

    if options.live {
        run_live(&mut engine, &mut config, &options, frame_rate, &mut renderer, &mut summary)?;
    } else {
        let Some(track) = options.track.as_deref() else {
            bail!("{}", USAGE);
        };
        let mut source = WavSource::open(track, frame_rate, config.analyser())
            .with_context(|| format!("opening {}", track))?;
        tracing::info!(track, frames = source.total_frames(), "playing");

        engine.start();
        drive(
            &mut engine,
            &mut source,
            &options,
            frame_rate,
            &mut renderer,
            &mut summary,
            WavSource::is_finished,
        );

        // Track over: back to a clean slate
        engine.reset();
    }

    if let Some(renderer) = renderer {
        renderer.finish()?;
    } else {
        summary.print(frame_rate);
    }
    Ok(())
}

fn checked_frame_rate(frame_rate: f32) -> Result<f32> {
    if !(MIN_FRAME_RATE..=MAX_FRAME_RATE).contains(&frame_rate) {
        bail!(
            "frame rate must be between {} and {}, got {}",
            MIN_FRAME_RATE,
            MAX_FRAME_RATE,
            frame_rate
        );
    }
    Ok(frame_rate)
}

/// Frame loop shared by file and live sources
fn drive<S: SpectrumSource>(
    engine: &mut StormEngine,
    source: &mut S,
    options: &Options,
    frame_rate: f32,
    renderer: &mut Option<JsonLinesRenderer>,
    summary: &mut Summary,
    finished: fn(&S) -> bool,
) {
    let frame_time = Duration::from_secs_f32(1.0 / frame_rate);
    let started = Instant::now();

    loop {
        if options.max_frames.is_some_and(|max| summary.frames >= max) {
            break;
        }
        let snapshot = source.frequency_snapshot();
        if snapshot.is_none() && finished(source) {
            break;
        }

        let Some(report) = engine.advance(snapshot.as_ref()) else {
            break;
        };
        summary.record(&report);

        match renderer {
            Some(r) => r.render(&report.scene),
            None if report.spawned > 0 => {
                let band = report.scene.bolts.last().map(|b| b.band.name()).unwrap_or("-");
                tracing::info!(
                    frame = report.frame,
                    seconds = report.frame as f32 / frame_rate,
                    bolts = report.spawned,
                    band,
                    "strike"
                );
            }
            None => {}
        }

        if options.realtime {
            let due = frame_time * summary.frames as u32;
            if let Some(wait) = due.checked_sub(started.elapsed()) {
                std::thread::sleep(wait);
            }
        }
    }
}

#[cfg(feature = "capture")]
fn list_devices() -> Result<()> {
    for (i, name) in phantom_storm::audio::CaptureSource::list_devices().iter().enumerate() {
        println!("[{}] {}", i, name);
    }
    Ok(())
}

#[cfg(not(feature = "capture"))]
fn list_devices() -> Result<()> {
    bail!("built without live capture; rebuild with --features capture")
}

#[cfg(feature = "capture")]
fn run_live(
    engine: &mut StormEngine,
    config: &mut Config,
    options: &Options,
    frame_rate: f32,
    renderer: &mut Option<JsonLinesRenderer>,
    summary: &mut Summary,
) -> Result<()> {
    use phantom_storm::audio::CaptureSource;

    let settings = config.analyser();
    let mut source = match (&options.device, config.last_device.as_deref()) {
        (Some(query), _) => {
            CaptureSource::new(settings, Some(query)).context("opening capture device")?
        }
        // A remembered device may be gone; fall back to the default pick
        (None, Some(last)) => {
            let remembered = DeviceQuery::Name(last.to_string());
            match CaptureSource::new(settings, Some(&remembered)) {
                Ok(source) => source,
                Err(e) => {
                    tracing::warn!("last device unavailable: {}", e);
                    CaptureSource::new(settings, None).context("opening capture device")?
                }
            }
        }
        (None, None) => CaptureSource::new(settings, None).context("opening capture device")?,
    };
    let device = source.device_name().to_string();
    if config.last_device.as_deref() != Some(device.as_str()) {
        if let Err(e) = config.set_device(&device) {
            tracing::warn!("could not remember device: {}", e);
        }
    }

    engine.start();
    drive(engine, &mut source, options, frame_rate, renderer, summary, |_| false);
    engine.reset();
    Ok(())
}

#[cfg(not(feature = "capture"))]
fn run_live(
    _engine: &mut StormEngine,
    _config: &mut Config,
    _options: &Options,
    _frame_rate: f32,
    _renderer: &mut Option<JsonLinesRenderer>,
    _summary: &mut Summary,
) -> Result<()> {
    bail!("built without live capture; rebuild with --features capture")
}
