//! Analyzer Coordinator
//!
//! Runs once per UI refresh tick on the analysis context. Each tick:
//!
//! 1. applies queued [`Command`]s
//! 2. reads `analyzer_enabled` once and settles on Idle or Active
//! 3. Active only: runs both spectrum pipelines and publishes new paths
//! 4. redesigns coefficients if the dirty flag was set and a filter field
//!    changed, or retries a publish that found the hand-off ring full
//! 5. asks the renderer to redraw
//!
//! Nothing here blocks. Each pipeline drains at most what its queues held
//! when the tick started.

use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use contour_dsp::{response_path, ChainCoefficients, FftOrder, PathBounds, SpectrumPath, SpectrumPipeline};

use crate::coefficients::CoefficientUpdater;
use crate::error::{EngineError, EngineResult};
use crate::message::{Channel, Command, Event};
use crate::params::{ChangeFlag, ParameterStore};

/// Whether the analyzer is doing FFT work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyzerState {
    /// No FFT or path work; sample queues keep overwriting
    Idle,
    #[default]
    Active,
}

/// Receives the end-of-tick repaint request
///
/// Must not block: it is called from the tick.
pub trait RedrawListener: Send {
    fn request_redraw(&self);

    /// Other coordinator notifications; ignored by default
    fn notify(&self, _event: Event) {}
}

impl RedrawListener for Sender<Event> {
    fn request_redraw(&self) {
        self.notify(Event::Redraw);
    }

    fn notify(&self, event: Event) {
        match self.try_send(event) {
            Ok(()) | Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                debug!("Event receiver dropped");
            }
        }
    }
}

/// Counters for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub state: AnalyzerState,
    /// Spectrum pipelines run (0 while Idle)
    pub pipeline_runs: usize,
    pub blocks: usize,
    pub frames: usize,
    pub paths: usize,
    /// Generation designed this tick, if parameters changed
    pub generation: Option<u64>,
    /// A coefficient publish is still waiting for ring space
    pub publish_pending: bool,
}

struct Snapshots {
    paths: [RwLock<Arc<SpectrumPath>>; 2],
    coefficients: RwLock<Arc<ChainCoefficients>>,
    sample_rate: f32,
}

/// Read-only view of the latest published analyzer state
///
/// Cheap to clone; every accessor returns the most recently published
/// immutable snapshot and holds its lock only long enough to clone an `Arc`.
#[derive(Clone)]
pub struct SnapshotReader {
    inner: Arc<Snapshots>,
}

impl SnapshotReader {
    fn new(coefficients: ChainCoefficients, sample_rate: f32) -> Self {
        Self {
            inner: Arc::new(Snapshots {
                paths: [
                    RwLock::new(Arc::new(SpectrumPath::default())),
                    RwLock::new(Arc::new(SpectrumPath::default())),
                ],
                coefficients: RwLock::new(Arc::new(coefficients)),
                sample_rate,
            }),
        }
    }

    pub fn spectrum_path(&self, channel: Channel) -> Arc<SpectrumPath> {
        Arc::clone(&self.inner.paths[channel.index()].read())
    }

    pub fn chain_coefficients(&self) -> Arc<ChainCoefficients> {
        Arc::clone(&self.inner.coefficients.read())
    }

    /// Response curve of the latest coefficients laid out in `bounds`
    pub fn response_curve(&self, bounds: PathBounds) -> SpectrumPath {
        response_path(&self.chain_coefficients(), self.inner.sample_rate, bounds)
    }

    fn publish_path(&self, channel: Channel, path: SpectrumPath) {
        *self.inner.paths[channel.index()].write() = Arc::new(path);
    }

    fn publish_coefficients(&self, coefficients: ChainCoefficients) {
        *self.inner.coefficients.write() = Arc::new(coefficients);
    }
}

pub struct AnalyzerCoordinator {
    params: Arc<ParameterStore>,
    dirty: Arc<ChangeFlag>,
    updater: CoefficientUpdater,
    /// `None` only if a rebuild failed; that channel then stays dark
    pipelines: [Option<SpectrumPipeline>; 2],
    state: AnalyzerState,
    dropped_seen: [u64; 2],
    reader: SnapshotReader,
    listener: Box<dyn RedrawListener>,
    command_tx: Sender<Command>,
    command_rx: Receiver<Command>,
}

impl AnalyzerCoordinator {
    /// `dirty` must already be subscribed to `params`
    pub(crate) fn new(
        params: Arc<ParameterStore>,
        dirty: Arc<ChangeFlag>,
        updater: CoefficientUpdater,
        pipelines: [SpectrumPipeline; 2],
        listener: Box<dyn RedrawListener>,
    ) -> Self {
        let reader = SnapshotReader::new(*updater.latest(), updater.sample_rate());
        let state = if params.analyzer_enabled() {
            AnalyzerState::Active
        } else {
            AnalyzerState::Idle
        };
        let [left, right] = pipelines;
        let (command_tx, command_rx) = unbounded();

        Self {
            params,
            dirty,
            updater,
            pipelines: [Some(left), Some(right)],
            state,
            dropped_seen: [0; 2],
            reader,
            listener,
            command_tx,
            command_rx,
        }
    }

    /// Run one analyzer cycle
    pub fn tick(&mut self) -> TickReport {
        self.apply_commands();

        let state = if self.params.analyzer_enabled() {
            AnalyzerState::Active
        } else {
            AnalyzerState::Idle
        };
        self.transition(state);

        let mut report = TickReport {
            state,
            ..Default::default()
        };

        if state == AnalyzerState::Active {
            self.run_pipelines(&mut report);
        }

        if self.dirty.take() {
            let params = self.params.snapshot();
            if let Some(generation) = self.updater.update(&params) {
                self.reader.publish_coefficients(*self.updater.latest());
                self.listener.notify(Event::CoefficientsUpdated { generation });
                report.generation = Some(generation);
            }
        } else {
            self.updater.flush();
        }
        report.publish_pending = self.updater.has_pending();

        self.listener.request_redraw();
        report
    }

    fn transition(&mut self, state: AnalyzerState) {
        if state == self.state {
            return;
        }
        info!("Analyzer {:?} -> {:?}", self.state, state);
        if state == AnalyzerState::Active {
            // Overwrites while idle are expected, not overruns
            for (seen, pipeline) in self.dropped_seen.iter_mut().zip(&self.pipelines) {
                if let Some(pipeline) = pipeline {
                    *seen = pipeline.dropped_blocks();
                }
            }
        }
        self.state = state;
        self.listener.notify(Event::AnalyzerStateChanged {
            enabled: state == AnalyzerState::Active,
        });
    }

    fn run_pipelines(&mut self, report: &mut TickReport) {
        for channel in Channel::ALL {
            let i = channel.index();
            let Some(pipeline) = self.pipelines[i].as_mut() else {
                continue;
            };

            let result = pipeline.process();
            report.pipeline_runs += 1;
            report.blocks += result.blocks;
            report.frames += result.frames;
            report.paths += result.paths;

            if result.paths > 0 {
                self.reader.publish_path(channel, pipeline.latest_path().clone());
            }

            let dropped = pipeline.dropped_blocks();
            if dropped > self.dropped_seen[i] {
                let lost = dropped - self.dropped_seen[i];
                debug!("{:?} analyzer overrun: {} blocks dropped", channel, lost);
                self.listener.notify(Event::QueueOverrun {
                    channel,
                    dropped: lost,
                });
                self.dropped_seen[i] = dropped;
            }
        }
    }

    fn apply_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            match command {
                Command::SetAnalyzerEnabled(enabled) => self.set_analyzer_enabled(enabled),
                Command::SetFftOrder(order) => {
                    if let Err(e) = self.set_fft_order(order) {
                        error!("FFT order change failed: {}", e);
                        self.listener.notify(Event::error(e));
                    }
                }
                Command::SetPathBounds(bounds) => self.set_path_bounds(bounds),
            }
        }
    }

    /// Toggle the analyzer; takes effect at the top of the next tick
    pub fn set_analyzer_enabled(&self, enabled: bool) {
        self.params.set_analyzer_enabled(enabled);
    }

    /// Rebuild both pipelines at a new FFT size
    pub fn set_fft_order(&mut self, order: FftOrder) -> EngineResult<()> {
        if self.fft_order() == Some(order) {
            return Ok(());
        }

        for pipeline in self.pipelines.iter().flatten() {
            let block_size = pipeline.config().block_size;
            if block_size > order.size() {
                return Err(EngineError::InvalidConfig(format!(
                    "Block size {} exceeds FFT size {}",
                    block_size,
                    order.size()
                )));
            }
        }

        for slot in &mut self.pipelines {
            if let Some(pipeline) = slot.take() {
                *slot = Some(pipeline.rebuild(order)?);
            }
        }

        info!("Spectrum pipelines rebuilt at FFT size {}", order.size());
        self.listener.notify(Event::FftOrderChanged {
            fft_size: order.size(),
        });
        Ok(())
    }

    pub fn set_path_bounds(&mut self, bounds: PathBounds) {
        for pipeline in self.pipelines.iter_mut().flatten() {
            pipeline.set_bounds(bounds);
        }
    }

    pub fn fft_order(&self) -> Option<FftOrder> {
        self.pipelines.iter().flatten().map(|p| p.order()).next()
    }

    pub fn state(&self) -> AnalyzerState {
        self.state
    }

    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Sender for commands applied at the start of the next tick
    pub fn commands(&self) -> Sender<Command> {
        self.command_tx.clone()
    }

    /// Generation most recently designed (may still be pending)
    pub fn generation(&self) -> u64 {
        self.updater.generation()
    }
}
