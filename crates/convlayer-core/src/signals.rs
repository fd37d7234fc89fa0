//! Per-tick input and output signals.
//!
//! ```text
//! Inputs                         Outputs
//! ──────────────  ─────          ──────────────  ─────
//! reset           level          used_data       pulse  sample accepted
//! start           pulse          results_valid   pulse  vector ready
//! data_ready      level          results         data   one i32 per engine
//! request_next    level/pulse    run_done        pulse  tick after last vector
//! sample          i8             running         level  state == Running
//! assertions      level (debug)
//! ```

use crate::aggregator::ResultVector;
use crate::state::RunState;

/// Everything the core samples in one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickInputs {
    /// Synchronous reset, level sensitive
    pub reset: bool,
    /// Start a run (honoured from Idle and Done)
    pub start: bool,
    /// Producer is presenting `sample`
    pub data_ready: bool,
    /// Consumer side grants the core the next sample
    pub request_next: bool,
    /// Activation sample on the bus
    pub sample: i8,
    /// Debug-only consistency checking
    pub assertions: bool,
}

impl TickInputs {
    /// All signals low.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Reset asserted, everything else low.
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Self::default()
        }
    }

    /// Start pulse.
    pub fn start() -> Self {
        Self {
            start: true,
            ..Self::default()
        }
    }

    /// Producer offers `sample` and the consumer asks for it.
    pub fn sample(sample: i8) -> Self {
        Self {
            data_ready: true,
            request_next: true,
            sample,
            ..Self::default()
        }
    }

    /// Set the start pulse.
    #[must_use]
    pub fn with_start(mut self, start: bool) -> Self {
        self.start = start;
        self
    }

    /// Set the reset level.
    #[must_use]
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Set the producer's data-ready level.
    #[must_use]
    pub fn with_data_ready(mut self, data_ready: bool) -> Self {
        self.data_ready = data_ready;
        self
    }

    /// Set the consumer's request.
    #[must_use]
    pub fn with_request_next(mut self, request_next: bool) -> Self {
        self.request_next = request_next;
        self
    }

    /// Enable or disable assertions.
    #[must_use]
    pub fn with_assertions(mut self, assertions: bool) -> Self {
        self.assertions = assertions;
        self
    }
}

/// Everything the core drives in one tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TickOutputs {
    /// The presented sample was accepted this tick
    pub used_data: bool,
    /// `results` carries a fresh vector
    pub results_valid: bool,
    /// Fresh vector, present exactly when `results_valid`
    pub results: Option<ResultVector>,
    /// The previous tick produced the run's final vector
    pub run_done: bool,
    /// State after this tick is Running
    pub running: bool,
    /// State after this tick
    pub state: RunState,
}
