//! Tick-level model of a multi-engine streaming 2-D convolution core.
//!
//! The core convolves a square matrix of signed 8-bit samples with up to 16
//! independent 3x3 kernels at once. Samples stream in one per accepted tick
//! under a ready/request handshake; every engine evaluates the same window in
//! the same tick and the results leave as one export-tagged vector.
//!
//! # Component hierarchy
//!
//! ```text
//! StreamController            tick handler, owns everything below
//!   ├── ConfigRegisterFile    shadow ⇄ active snapshots, cloned at Loading
//!   ├── KernelBank            control-plane weights, copied into engines
//!   ├── WindowBuffer          last 2n+3 samples, shared read-only
//!   ├── ConvolutionEngine×N   Σ k·w >> shift, lockstep
//!   └── OutputAggregator      one tagged ResultVector per window
//! ```
//!
//! # Quick start
//!
//! ```
//! use convlayer_core::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let mut ctl = StreamController::with_config(
//!     Configuration::default().with_engine_count(1).with_matrix_size(4),
//! );
//! ctl.set_kernel(0, KernelWeights::new([0, 0, 0, 0, 1, 0, 0, 0, 0]))?;
//!
//! let matrix = ActivationMatrix::from_fn(4, |r, c| (r * 4 + c) as i8);
//! let report = TickDriver::new(&mut ctl).run(&matrix, &StallPattern::none(), &mut DiscardSink)?;
//!
//! // identity kernel picks the window centres
//! assert_eq!(report.engine_results(0), vec![5, 6, 9, 10]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

mod aggregator;
mod config;
mod controller;
pub mod driver;
mod engine;
mod error;
mod kernel;
mod matrix;
pub mod reference;
mod signals;
pub mod state;
mod window;

/// Silicon constants (re-exported from convlayer-chip).
pub mod geometry {
    pub use convlayer_chip::geometry::{
        output_dim, outputs_per_engine, window_capacity, KERNEL_SIZE, KERNEL_TAPS,
        MAX_ABS_ACCUMULATOR, MAX_ENGINES,
    };
}

pub use aggregator::{
    DiscardSink, ExportSink, MemorySink, OutputAggregator, ResultVector, WindowPosition,
};
pub use config::{ConfigField, ConfigRegisterFile, Configuration, Register};
pub use controller::StreamController;
pub use driver::{RunReport, StallPattern, TickDriver, DEFAULT_MAX_TICKS};
pub use engine::{apply_shift, evaluate_lockstep, ConvolutionEngine};
pub use error::{ConvError, Result};
pub use kernel::{KernelBank, KernelWeights};
pub use matrix::ActivationMatrix;
pub use reference::{reference_convolution, reference_vectors};
pub use signals::{TickInputs, TickOutputs};
pub use state::{transition, RunState};
pub use window::WindowBuffer;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        ActivationMatrix, ConfigField, Configuration, ConvError, DiscardSink, ExportSink,
        KernelWeights, MemorySink, Register, Result, ResultVector, RunReport, RunState,
        StallPattern, StreamController, TickDriver, TickInputs, TickOutputs,
    };
}
