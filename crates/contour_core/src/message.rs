//! Message Types for Thread Communication
//!
//! Commands flow from UI thread -> analyzer coordinator
//! Events flow from analyzer coordinator -> UI thread

use serde::{Deserialize, Serialize};

use contour_dsp::{FftOrder, PathBounds};

/// Analyzer channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Left, Channel::Right];

    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

/// Commands sent to the coordinator, applied at the top of its next tick
#[derive(Debug, Clone)]
pub enum Command {
    /// Show or hide the analyzer
    SetAnalyzerEnabled(bool),

    /// Rebuild both spectrum pipelines at a new FFT size
    SetFftOrder(FftOrder),

    /// Resize the analysis area
    SetPathBounds(PathBounds),
}

/// Events sent from the coordinator to the UI thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Latest paths and coefficients are ready; repaint
    Redraw,

    /// A new coefficient generation was published to the audio thread
    CoefficientsUpdated { generation: u64 },

    /// Analyzer switched between Idle and Active
    AnalyzerStateChanged { enabled: bool },

    /// Spectrum pipelines rebuilt at a new FFT size
    FftOrderChanged { fft_size: usize },

    /// Sample blocks were overwritten before the analyzer could drain them
    QueueOverrun { channel: Channel, dropped: u64 },

    /// Error occurred
    Error { message: String },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}
