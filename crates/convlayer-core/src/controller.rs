//! Stream controller: the tick handler that owns the whole datapath.
//!
//! One call to [`StreamController::tick`] is one clock edge. All mutation of
//! the window, cursor, engines and aggregator happens here; engines only see
//! `&WindowBuffer`. The control plane (register writes, kernel writes) may
//! be used between ticks at any time; it only ever touches the shadow
//! configuration and the kernel bank.
//!
//! ## Handshake
//!
//! While Running, a sample is accepted in a tick iff `data_ready` and
//! `request_next` are both high. `used_data` acknowledges it in the same
//! tick. With `data_ready` low the cursor does not move, which is how
//! backpressure stalls the pipeline. A producer that drops `data_ready`
//! before its sample was accepted has withdrawn it: a protocol violation.
//!
//! ## Faults
//!
//! Configuration errors at Loading and protocol violations are reported
//! through [`StreamController::fault`] only while assertions are enabled.
//! With assertions off they are logged at debug level and otherwise
//! invisible; the datapath stays consistent either way.

use tracing::{debug, error, info, trace};

use crate::aggregator::{OutputAggregator, WindowPosition};
use crate::config::{ConfigField, ConfigRegisterFile, Configuration, Register};
use crate::engine::{evaluate_lockstep, ConvolutionEngine};
use crate::error::{ConvError, Result};
use crate::kernel::{KernelBank, KernelWeights};
use crate::signals::{TickInputs, TickOutputs};
use crate::state::{transition, RunState};
use crate::window::WindowBuffer;
use convlayer_chip::geometry::KERNEL_SIZE;

/// Row-major position of the stream within the active matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct StreamCursor {
    accepted: usize,
    matrix_size: usize,
    stride: usize,
}

impl StreamCursor {
    fn new(matrix_size: usize, stride: usize) -> Self {
        Self {
            accepted: 0,
            matrix_size,
            stride,
        }
    }

    /// Count one accepted sample; returns the output position if it
    /// completes a stride-aligned window.
    fn advance(&mut self) -> Option<WindowPosition> {
        if self.matrix_size == 0 || self.stride == 0 {
            return None;
        }
        let index = self.accepted;
        self.accepted += 1;

        let row = index / self.matrix_size;
        let col = index % self.matrix_size;
        if row < KERNEL_SIZE - 1 || col < KERNEL_SIZE - 1 {
            return None;
        }
        let top = row - (KERNEL_SIZE - 1);
        let left = col - (KERNEL_SIZE - 1);
        if top % self.stride != 0 || left % self.stride != 0 {
            return None;
        }
        Some(WindowPosition {
            row: top / self.stride,
            col: left / self.stride,
        })
    }
}

/// Top-level state machine of the convolution core.
#[derive(Debug, Clone, Default)]
pub struct StreamController {
    registers: ConfigRegisterFile,
    kernels: KernelBank,
    engines: Vec<ConvolutionEngine>,
    window: WindowBuffer,
    aggregator: OutputAggregator,
    results: Vec<i32>,
    cursor: StreamCursor,
    state: RunState,
    /// `data_ready` was high last tick and the sample was not taken.
    offered: bool,
    /// Final vector went out last tick; `run_done` pulses this tick.
    done_pulse: bool,
    assertions: bool,
    fault: Option<ConvError>,
    ticks: u64,
}

impl StreamController {
    /// Controller in Idle with default configuration and zeroed kernels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller in Idle with `config` in the shadow registers.
    pub fn with_config(config: Configuration) -> Self {
        Self {
            registers: ConfigRegisterFile::new(config),
            ..Self::default()
        }
    }

    // ── Control plane ────────────────────────────────────────────────────────

    /// Write one shadow configuration field.
    ///
    /// # Errors
    ///
    /// Returns `FieldOutOfRange` if `value` does not fit the field.
    pub fn write_field(&mut self, field: ConfigField, value: u32) -> Result<()> {
        self.registers.write(field, value)
    }

    /// Write one shadow configuration register word.
    pub fn write_register(&mut self, register: Register, word: u32) {
        self.registers.write_register(register, word);
    }

    /// Replace the whole shadow configuration.
    pub fn configure(&mut self, config: Configuration) {
        self.registers.set_shadow(config);
    }

    /// Read a field with run visibility (active during a run).
    pub fn read_field(&self, field: ConfigField) -> u32 {
        self.registers.read(field)
    }

    /// Stage kernel weights for an engine slot.
    ///
    /// The weights reach an engine at the next Loading transition. Writing
    /// while a run is in flight is a protocol violation; the running
    /// engines are unaffected either way.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEngine` if `engine` is not a bank slot.
    pub fn set_kernel(&mut self, engine: usize, weights: KernelWeights) -> Result<()> {
        self.kernels.set(engine, weights)?;
        if matches!(self.state, RunState::Loading | RunState::Running) {
            self.raise(ConvError::protocol(format!(
                "kernel {engine} written while {}",
                self.state
            )));
        }
        Ok(())
    }

    /// Register file.
    pub fn registers(&self) -> &ConfigRegisterFile {
        &self.registers
    }

    /// Register file, for direct shadow writes.
    pub fn registers_mut(&mut self) -> &mut ConfigRegisterFile {
        &mut self.registers
    }

    /// Kernel bank.
    pub fn kernels(&self) -> &KernelBank {
        &self.kernels
    }

    // ── Observation ──────────────────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Configuration of the current or most recent run.
    pub fn active_config(&self) -> &Configuration {
        self.registers.active()
    }

    /// Engines loaded for the current run.
    pub fn engines(&self) -> &[ConvolutionEngine] {
        &self.engines
    }

    /// Shared window buffer.
    pub fn window(&self) -> &WindowBuffer {
        &self.window
    }

    /// Output aggregator.
    pub fn aggregator(&self) -> &OutputAggregator {
        &self.aggregator
    }

    /// Samples accepted this run.
    pub fn samples_accepted(&self) -> usize {
        self.cursor.accepted
    }

    /// Ticks since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Most recent fault raised under assertions.
    pub fn fault(&self) -> Option<&ConvError> {
        self.fault.as_ref()
    }

    /// Take and clear the recorded fault.
    pub fn take_fault(&mut self) -> Option<ConvError> {
        self.fault.take()
    }

    // ── Tick ─────────────────────────────────────────────────────────────────

    /// Advance one clock edge.
    pub fn tick(&mut self, inputs: &TickInputs) -> TickOutputs {
        self.ticks += 1;
        self.assertions = inputs.assertions;
        let done_pulse = std::mem::take(&mut self.done_pulse);
        let mut out = TickOutputs::default();

        let next = transition(self.state, inputs);
        if next != self.state {
            debug!("tick {}: {} -> {next}", self.ticks, self.state);
        }
        self.state = next;

        match next {
            RunState::Resetting => self.clear_datapath(),
            RunState::Loading => self.load(),
            RunState::Running => self.stream(inputs, &mut out),
            RunState::Idle | RunState::Done => {}
        }

        out.run_done = done_pulse && !inputs.reset;
        out.running = self.state == RunState::Running;
        out.state = self.state;
        out
    }

    fn load(&mut self) {
        let config = match self.registers.clone_to_active() {
            Ok(config) => config,
            Err(err) => {
                self.state = RunState::Idle;
                self.raise(err);
                return;
            }
        };

        let matrix_size = config.matrix_size as usize;
        let engine_count = config.engine_count as usize;

        self.engines.clear();
        self.engines.extend(
            self.kernels
                .leading(engine_count)
                .iter()
                .enumerate()
                .map(|(index, kernel)| ConvolutionEngine::new(index, *kernel, config.shift)),
        );
        self.window.prime(matrix_size);
        self.cursor = StreamCursor::new(matrix_size, config.stride as usize);
        self.aggregator
            .begin_run(engine_count, config.expected_outputs(), config.save_to_mem);
        self.offered = false;

        info!(
            "run loaded: {matrix_size}x{matrix_size} stride={} shift={} engines={} export={} ({} vectors)",
            config.stride,
            config.shift,
            engine_count,
            config.save_to_mem,
            config.expected_outputs()
        );
    }

    fn stream(&mut self, inputs: &TickInputs, out: &mut TickOutputs) {
        let accepted = inputs.data_ready && inputs.request_next;
        if self.offered && !inputs.data_ready {
            self.raise(ConvError::protocol(format!(
                "sample withdrawn before acceptance at stream index {}",
                self.cursor.accepted
            )));
        }
        self.offered = inputs.data_ready && !accepted;
        if !accepted {
            return;
        }

        out.used_data = true;
        self.window.push(inputs.sample);
        trace!("sample #{} = {}", self.cursor.accepted, inputs.sample);

        let Some(position) = self.cursor.advance() else {
            return;
        };
        evaluate_lockstep(&self.engines, &self.window, &mut self.results);
        self.aggregator.collect(position, &self.results);
        out.results = self.aggregator.take_fresh();
        out.results_valid = out.results.is_some();

        if self.aggregator.is_complete() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        self.state = RunState::Done;
        self.done_pulse = true;
        self.offered = false;
        self.registers.end_run();
        info!(
            "run done: {} vectors from {} samples",
            self.aggregator.emitted(),
            self.cursor.accepted
        );
    }

    fn clear_datapath(&mut self) {
        self.window.clear();
        self.cursor = StreamCursor::default();
        self.aggregator.clear();
        self.engines.clear();
        self.results.clear();
        self.offered = false;
        self.done_pulse = false;
        self.registers.end_run();
    }

    fn raise(&mut self, err: ConvError) {
        if self.assertions {
            error!("tick {}: {err}", self.ticks);
            self.fault = Some(err);
        } else {
            debug!("tick {}: {err} (assertions off)", self.ticks);
        }
    }
}
