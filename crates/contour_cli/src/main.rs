//! Contour CLI - drive the EQ and analyzer without a host
//!
//! Synthesizes a two-tone stereo signal on a simulated audio thread, runs it
//! through the engine while the analyzer timer ticks, then reports where the
//! spectrum peaks landed and what the chain response looks like.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use crossbeam_channel::{unbounded, RecvTimeoutError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use contour_core::{
    AnalyzerTimer, Channel, Engine, EngineConfig, Event, ParameterStore, SnapshotReader,
};
use contour_dsp::{
    map_to_log10, AudioProcessor, FftOrder, FilterParameters, ProcessContext, Slope,
    MAX_FREQUENCY, MIN_FREQUENCY,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Default,
    LowLatency,
    HighResolution,
}

#[derive(Parser)]
#[command(name = "contour", about = "Parametric EQ with spectrum analyzer (headless)", version)]
struct Cli {
    /// Engine configuration preset
    #[arg(long, value_enum, default_value = "default")]
    preset: Preset,

    /// Sample rate in Hz
    #[arg(long, default_value_t = 48000.0)]
    sample_rate: f32,

    /// FFT order (11 = 2048, 12 = 4096, 13 = 8192); overrides the preset
    #[arg(long, value_parser = clap::value_parser!(u32).range(11..=13))]
    fft_order: Option<u32>,

    /// Host callback size in frames
    #[arg(long, default_value_t = 256)]
    host_block: usize,

    /// Seconds of audio to run
    #[arg(long, default_value_t = 2.0)]
    seconds: f32,

    /// Test tone frequencies (Hz)
    #[arg(long, num_args = 1.., default_values_t = [440.0, 5000.0])]
    tones: Vec<f32>,

    #[arg(long, default_value_t = 20.0)]
    low_cut: f32,

    /// Cut slope in dB/oct (12, 24, 36 or 48)
    #[arg(long, default_value_t = 12)]
    slope: usize,

    #[arg(long, default_value_t = 20000.0)]
    high_cut: f32,

    #[arg(long, default_value_t = 750.0)]
    peak_freq: f32,

    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    peak_gain: f32,

    #[arg(long, default_value_t = 1.0)]
    peak_q: f32,

    /// Halfway through the run, move the peak gain to this value
    #[arg(long, allow_hyphen_values = true)]
    sweep_to: Option<f32>,

    /// Start with the analyzer hidden
    #[arg(long)]
    no_analyzer: bool,
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let mut config = match self.preset {
            Preset::Default => EngineConfig::default(),
            Preset::LowLatency => EngineConfig::low_latency(),
            Preset::HighResolution => EngineConfig::high_resolution(),
        };
        config.sample_rate = self.sample_rate;
        if let Some(exponent) = self.fft_order {
            config.fft_order = FftOrder::from_exponent(exponent)?;
        }
        config.validate()?;
        Ok(config)
    }

    fn parameters(&self) -> FilterParameters {
        let slope = Slope::from_index((self.slope / 12).saturating_sub(1));
        FilterParameters {
            low_cut_freq: self.low_cut,
            low_cut_slope: slope,
            high_cut_freq: self.high_cut,
            high_cut_slope: slope,
            peak_freq: self.peak_freq,
            peak_gain_db: self.peak_gain,
            peak_quality: self.peak_q,
            analyzer_enabled: !self.no_analyzer,
            ..Default::default()
        }
    }
}

/// Interleaved stereo tone generator; right channel is 6 dB quieter
struct ToneSource {
    tones: Vec<f32>,
    sample_rate: f32,
    position: u64,
}

impl ToneSource {
    fn fill(&mut self, buffer: &mut [f32]) {
        let gain = 0.5 / self.tones.len().max(1) as f32;
        for frame in buffer.chunks_exact_mut(2) {
            let t = self.position as f32 / self.sample_rate;
            let s: f32 = self
                .tones
                .iter()
                .map(|f| (2.0 * std::f32::consts::PI * f * t).sin())
                .sum::<f32>()
                * gain;
            frame[0] = s;
            frame[1] = s * 0.5;
            self.position += 1;
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.engine_config().context("invalid engine configuration")?;
    let params = Arc::new(ParameterStore::new(cli.parameters()));

    let (event_tx, event_rx) = unbounded();
    let Engine {
        mut processor,
        coordinator,
    } = Engine::build(config.clone(), Arc::clone(&params), Box::new(event_tx))?;

    let reader = coordinator.reader();
    let timer = AnalyzerTimer::start(coordinator, config.tick_interval())?;

    let host_block = cli.host_block.max(1);
    let total_frames = (cli.seconds.max(0.0) * config.sample_rate) as u64;
    let block_duration = Duration::from_secs_f32(host_block as f32 / config.sample_rate);
    let mut source = ToneSource {
        tones: cli.tones.clone(),
        sample_rate: config.sample_rate,
        position: 0,
    };
    let context = ProcessContext::new(config.sample_rate, 2, host_block);

    info!(
        "Running {:.1}s of audio in {}-frame callbacks",
        cli.seconds, host_block
    );
    let audio = thread::Builder::new()
        .name("contour-audio".into())
        .spawn(move || {
            let mut buffer = vec![0.0_f32; host_block * 2];
            let mut processed = 0u64;
            let started = Instant::now();
            while processed < total_frames {
                source.fill(&mut buffer);
                processor.process(&mut buffer, &context);
                processed += host_block as u64;

                // Pace like a real device
                let due = block_duration * (processed / host_block as u64) as u32;
                if let Some(wait) = due.checked_sub(started.elapsed()) {
                    thread::sleep(wait);
                }
            }
            processor
        })
        .context("failed to spawn audio thread")?;

    let sweep_at = Instant::now() + Duration::from_secs_f32(cli.seconds / 2.0);
    let mut swept = cli.sweep_to.is_none();
    let mut redraws = 0u64;

    while !audio.is_finished() {
        if !swept && Instant::now() >= sweep_at {
            if let Some(gain) = cli.sweep_to {
                info!("Sweeping peak gain to {} dB", gain);
                params.update(|p| p.peak_gain_db = gain);
            }
            swept = true;
        }

        match event_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(Event::Redraw) => redraws += 1,
            Ok(Event::CoefficientsUpdated { generation }) => {
                info!("Coefficient generation {} published", generation)
            }
            Ok(Event::QueueOverrun { channel, dropped }) => {
                warn!("{:?} analyzer dropped {} blocks", channel, dropped)
            }
            Ok(other) => debug!("Event: {:?}", other),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    let processor = audio
        .join()
        .map_err(|_| anyhow::anyhow!("audio thread panicked"))?;
    let ticks = timer.ticks();
    drop(timer);
    redraws += event_rx.try_iter().filter(|e| *e == Event::Redraw).count() as u64;

    info!(
        "Done: {} analyzer ticks, {} redraws, running generation {}",
        ticks,
        redraws,
        processor.generation()
    );
    report(&reader, &config);
    Ok(())
}

/// Print the strongest spectrum points per channel and a coarse response curve
fn report(reader: &SnapshotReader, config: &EngineConfig) {
    let bounds = config.path_bounds;
    let to_freq = |x: f32| map_to_log10(x / bounds.width, MIN_FREQUENCY, MAX_FREQUENCY);
    let to_db = |y: f32| config.noise_floor_db * (y / bounds.height);

    for channel in Channel::ALL {
        let path = reader.spectrum_path(channel);
        if path.is_empty() {
            println!("{:?}: no spectrum (analyzer idle or not enough audio)", channel);
            continue;
        }

        let mut points: Vec<(f32, f32)> = path.vertices().to_vec();
        points.sort_by(|a, b| a.1.total_cmp(&b.1));
        println!("{:?} spectrum peaks:", channel);
        for &(x, y) in points.iter().take(3) {
            println!("  {:>8.1} Hz  {:>6.1} dB", to_freq(x), to_db(y));
        }
    }

    let coefficients = reader.chain_coefficients();
    println!("Chain response (generation {}):", coefficients.generation);
    for freq in [20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0] {
        let magnitude = coefficients.magnitude_for_frequency(freq, config.sample_rate as f64);
        let db = 20.0 * magnitude.max(1e-6).log10();
        println!("  {:>8.0} Hz  {:>+6.1} dB", freq, db);
    }
}
