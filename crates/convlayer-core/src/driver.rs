//! Simple tick-loop driver.
//!
//! Plays an [`ActivationMatrix`] into a [`StreamController`] the way a
//! well-behaved producer would: pulse start, present the next unaccepted
//! sample every tick, drop `data_ready` on stall ticks, stop at `run_done`.
//! The core itself has no timeouts; the driver's tick budget is the only
//! thing that ends a stalled run.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::aggregator::{ExportSink, ResultVector};
use crate::controller::StreamController;
use crate::error::{ConvError, Result};
use crate::matrix::ActivationMatrix;
use crate::signals::TickInputs;
use crate::state::RunState;

/// Tick budget of the bring-up bench.
pub const DEFAULT_MAX_TICKS: u64 = 1000;

/// Stream ticks (counted from the first tick after start) on which the
/// producer holds `data_ready` low.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StallPattern {
    ticks: BTreeSet<u64>,
}

impl StallPattern {
    /// Never stall.
    pub fn none() -> Self {
        Self::default()
    }

    /// Stall on each listed tick.
    pub fn at(ticks: impl IntoIterator<Item = u64>) -> Self {
        Self {
            ticks: ticks.into_iter().collect(),
        }
    }

    /// Stall for `len` consecutive ticks from `start`.
    pub fn burst(start: u64, len: u64) -> Self {
        Self::at(start..start + len)
    }

    /// Stall every `period`-th tick (ticks `period-1`, `2·period-1`, …)
    /// below `until`.
    pub fn every(period: u64, until: u64) -> Self {
        if period == 0 {
            return Self::none();
        }
        Self::at((1..=until / period).map(|k| k * period - 1))
    }

    /// True if the producer stalls on stream tick `tick`.
    pub fn contains(&self, tick: u64) -> bool {
        self.ticks.contains(&tick)
    }

    /// Number of stall ticks.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// True if the pattern never stalls.
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

/// What one driven run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Every result vector, in emission order
    pub vectors: Vec<ResultVector>,
    /// Stream ticks until `run_done` was seen (inclusive)
    pub ticks: u64,
    /// Stream tick on which each vector appeared
    pub vector_ticks: Vec<u64>,
    /// Samples the core accepted
    pub samples_used: usize,
    /// Vectors handed to the export sink
    pub exported: usize,
}

impl RunReport {
    /// Results of one engine across the run.
    pub fn engine_results(&self, engine: usize) -> Vec<i32> {
        self.vectors
            .iter()
            .filter_map(|vector| vector.engine(engine))
            .collect()
    }
}

/// Tick loop around a controller.
#[derive(Debug)]
pub struct TickDriver<'a> {
    controller: &'a mut StreamController,
    max_ticks: u64,
    assertions: bool,
}

impl<'a> TickDriver<'a> {
    /// Driver with the default tick budget and assertions on.
    pub fn new(controller: &'a mut StreamController) -> Self {
        Self {
            controller,
            max_ticks: DEFAULT_MAX_TICKS,
            assertions: true,
        }
    }

    /// Change the tick budget of each run.
    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Drive the assertions input.
    #[must_use]
    pub fn with_assertions(mut self, assertions: bool) -> Self {
        self.assertions = assertions;
        self
    }

    /// The driven controller.
    pub fn controller(&mut self) -> &mut StreamController {
        self.controller
    }

    /// Hold reset for `ticks` ticks, then release it for one tick.
    pub fn reset(&mut self, ticks: u64) {
        let hold = TickInputs::reset().with_assertions(self.assertions);
        for _ in 0..ticks {
            self.controller.tick(&hold);
        }
        self.controller
            .tick(&TickInputs::idle().with_assertions(self.assertions));
        debug!("reset held {ticks} ticks, now {}", self.controller.state());
    }

    /// Start a run and stream `matrix` into it.
    ///
    /// # Errors
    ///
    /// - `Configuration` if the shadow configuration is not runnable
    /// - `InvalidMatrix` if `matrix` does not match the configured size
    /// - `Protocol` if the controller ignored the start pulse
    /// - `Timeout` if `run_done` is not seen within the tick budget
    pub fn run(
        &mut self,
        matrix: &ActivationMatrix,
        stalls: &StallPattern,
        sink: &mut dyn ExportSink,
    ) -> Result<RunReport> {
        let shadow = *self.controller.registers().shadow();
        shadow.validate()?;
        if matrix.size() != shadow.matrix_size as usize {
            return Err(ConvError::invalid_matrix(format!(
                "{0}x{0} matrix for a {1}x{1} run",
                matrix.size(),
                shadow.matrix_size
            )));
        }

        let out = self
            .controller
            .tick(&TickInputs::start().with_assertions(self.assertions));
        if out.state != RunState::Loading {
            return Err(ConvError::protocol(format!(
                "start ignored in state {}",
                out.state
            )));
        }

        let samples = matrix.samples();
        let mut report = RunReport::default();
        let mut next = 0usize;

        for tick in 0..self.max_ticks {
            let sample = samples.get(next).copied();
            let inputs = TickInputs {
                data_ready: sample.is_some() && !stalls.contains(tick),
                request_next: true,
                sample: sample.unwrap_or(0),
                assertions: self.assertions,
                ..TickInputs::default()
            };
            let out = self.controller.tick(&inputs);

            if out.used_data {
                next += 1;
            }
            if let Some(vector) = out.results {
                if vector.export {
                    sink.export(&vector);
                    report.exported += 1;
                }
                report.vectors.push(vector);
                report.vector_ticks.push(tick);
            }
            if out.run_done {
                report.ticks = tick + 1;
                report.samples_used = next;
                debug!(
                    "run finished after {} ticks, {} vectors",
                    report.ticks,
                    report.vectors.len()
                );
                return Ok(report);
            }
        }

        warn!(
            "run not done after {} ticks ({} samples accepted)",
            self.max_ticks, next
        );
        Err(ConvError::Timeout {
            ticks: self.max_ticks,
        })
    }
}
